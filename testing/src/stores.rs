//! In-memory flight, reservation, and booking stores.
//!
//! All three guard their state with a `std::sync::Mutex` held only for the
//! duration of the operation, which makes every trait method atomic exactly
//! the way the single-statement `PostgreSQL` queries are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::error::StoreError;
use skybook_core::stores::{BookingStore, FlightStore, ReservationStore};
use skybook_core::types::{
    Booking, BookingId, BookingLeg, BookingStatus, Flight, FlightId, FlightStatus, Money,
    SeatReservation, UserId,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds a bookable test flight with `available` of `available` seats out of
/// an equal total capacity.
#[must_use]
pub fn test_flight(flight_id: &str, available: u32) -> Flight {
    let now = Utc::now();
    Flight {
        flight_id: FlightId::new(flight_id),
        source: "AAA".to_string(),
        destination: "BBB".to_string(),
        departure_time: now + chrono::Duration::days(7),
        arrival_time: now + chrono::Duration::days(7) + chrono::Duration::hours(2),
        total_seats: available,
        available_seats: available,
        price: Money::from_cents(10_000),
        status: FlightStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Flights
// ============================================================================

/// In-memory [`FlightStore`].
#[derive(Debug, Default)]
pub struct InMemoryFlightStore {
    flights: Mutex<HashMap<FlightId, Flight>>,
}

impl InMemoryFlightStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds (or replaces) a flight.
    pub fn put(&self, flight: Flight) {
        locked(&self.flights).insert(flight.flight_id.clone(), flight);
    }

    /// Current `available_seats` for assertions, `None` if unknown.
    #[must_use]
    pub fn available(&self, flight_id: &FlightId) -> Option<u32> {
        locked(&self.flights)
            .get(flight_id)
            .map(|f| f.available_seats)
    }
}

#[async_trait]
impl FlightStore for InMemoryFlightStore {
    async fn get(&self, flight_id: &FlightId) -> Result<Option<Flight>, StoreError> {
        Ok(locked(&self.flights).get(flight_id).cloned())
    }

    async fn conditional_decrement(
        &self,
        flight_id: &FlightId,
        seats: u32,
    ) -> Result<bool, StoreError> {
        let mut flights = locked(&self.flights);
        match flights.get_mut(flight_id) {
            Some(flight) if flight.available_seats >= seats => {
                flight.available_seats -= seats;
                flight.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment(&self, flight_id: &FlightId, seats: u32) -> Result<(), StoreError> {
        let mut flights = locked(&self.flights);
        if let Some(flight) = flights.get_mut(flight_id) {
            flight.available_seats = (flight.available_seats + seats).min(flight.total_seats);
            flight.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Flight>, StoreError> {
        Ok(locked(&self.flights)
            .values()
            .filter(|f| f.status == FlightStatus::Active)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// In-memory [`ReservationStore`] with the active-row uniqueness guard.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    rows: Mutex<Vec<SeatReservation>>,
}

impl InMemoryReservationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row ever inserted, soft-deleted included (for assertions).
    #[must_use]
    pub fn all_rows(&self) -> Vec<SeatReservation> {
        locked(&self.rows).clone()
    }

    /// Number of currently active rows across all bookings.
    #[must_use]
    pub fn active_count(&self) -> usize {
        locked(&self.rows)
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .count()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: &SeatReservation) -> Result<(), StoreError> {
        let mut rows = locked(&self.rows);
        let duplicate = rows.iter().any(|r| {
            r.deleted_at.is_none()
                && r.booking_id == reservation.booking_id
                && r.flight_id == reservation.flight_id
        });
        if duplicate {
            return Err(StoreError::DuplicateReservation(
                reservation.booking_id.clone(),
                reservation.flight_id.clone(),
            ));
        }
        rows.push(reservation.clone());
        Ok(())
    }

    async fn find_active_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<SeatReservation>, StoreError> {
        Ok(locked(&self.rows)
            .iter()
            .filter(|r| r.deleted_at.is_none() && &r.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn exists_active(&self, booking_id: &BookingId) -> Result<bool, StoreError> {
        Ok(locked(&self.rows)
            .iter()
            .any(|r| r.deleted_at.is_none() && &r.booking_id == booking_id))
    }

    async fn soft_delete_by_booking(
        &self,
        booking_id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut rows = locked(&self.rows);
        let mut claimed = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.deleted_at.is_none() && &r.booking_id == booking_id)
        {
            row.deleted_at = Some(now);
            claimed += 1;
        }
        Ok(claimed)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<SeatReservation>, StoreError> {
        Ok(locked(&self.rows)
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.is_expired(now))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// In-memory [`BookingStore`] with a unique idempotency-key index.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<BookingId, (Booking, Vec<BookingLeg>)>>,
}

impl InMemoryBookingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a booking, for assertions.
    #[must_use]
    pub fn status_of(&self, booking_id: &BookingId) -> Option<BookingStatus> {
        locked(&self.bookings)
            .get(booking_id)
            .map(|(b, _)| b.status)
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking, legs: &[BookingLeg]) -> Result<(), StoreError> {
        let mut bookings = locked(&self.bookings);
        if let Some(key) = booking.idempotency_key.as_deref() {
            let collision = bookings
                .values()
                .any(|(b, _)| b.idempotency_key.as_deref() == Some(key));
            if collision {
                return Err(StoreError::IdempotencyConflict);
            }
        }
        bookings.insert(booking.booking_id.clone(), (booking.clone(), legs.to_vec()));
        Ok(())
    }

    async fn find_by_id(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError> {
        Ok(locked(&self.bookings).get(booking_id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError> {
        Ok(locked(&self.bookings)
            .values()
            .find(|(b, _)| b.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<(Booking, Vec<BookingLeg>)>, StoreError> {
        let mut found: Vec<(Booking, Vec<BookingLeg>)> = locked(&self.bookings)
            .values()
            .filter(|(b, _)| &b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|(a, _), (b, _)| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(locked(&self.bookings)
            .values()
            .filter(|(b, _)| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .map(|(b, _)| b.clone())
            .collect())
    }

    async fn transition_status(
        &self,
        booking_id: &BookingId,
        expected: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError> {
        let mut bookings = locked(&self.bookings);
        match bookings.get_mut(booking_id) {
            Some((booking, _)) if booking.status == expected => {
                booking.status = to;
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_payment_id(
        &self,
        booking_id: &BookingId,
        payment_id: &str,
    ) -> Result<(), StoreError> {
        let mut bookings = locked(&self.bookings);
        if let Some((booking, _)) = bookings.get_mut(booking_id) {
            booking.payment_id = Some(payment_id.to_string());
            booking.updated_at = Utc::now();
        }
        Ok(())
    }
}
