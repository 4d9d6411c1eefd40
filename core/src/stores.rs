//! Persistence seams: flights, seat reservations, bookings.
//!
//! The inventory engine and orchestrator are written against these traits;
//! `skybook-store` provides the `PostgreSQL` implementations and
//! `skybook-testing` the in-memory ones. Each method is atomic on its own —
//! multi-statement sequences are composed by the engine under the per-flight
//! mutex.

use crate::error::StoreError;
use crate::types::{
    Booking, BookingId, BookingLeg, BookingStatus, Flight, FlightId, SeatReservation, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Authoritative flight persistence, including the seat counter.
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Fetches a flight by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn get(&self, flight_id: &FlightId) -> Result<Option<Flight>, StoreError>;

    /// Atomically decrements `available_seats` by `seats` iff at least that
    /// many are available. Returns whether the row was updated.
    ///
    /// Serialized against any other decrement/increment on the same flight
    /// (single-row update with predicate). The caller treats `false` as
    /// "insufficient seats" and never retries here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn conditional_decrement(
        &self,
        flight_id: &FlightId,
        seats: u32,
    ) -> Result<bool, StoreError>;

    /// Unconditionally returns `seats` to the flight, clamped at
    /// `total_seats`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn increment(&self, flight_id: &FlightId, seats: u32) -> Result<(), StoreError>;

    /// Lists flights in `ACTIVE` status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn list_active(&self) -> Result<Vec<Flight>, StoreError>;
}

/// Persistence for TTL-bounded seat holds.
///
/// A reservation is *active* while `deleted_at IS NULL`; all query methods
/// filter on that predicate. Rows are never hard-deleted.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a fresh reservation row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateReservation`] when an active row for
    /// the same `(booking_id, flight_id)` already exists, and
    /// [`StoreError::Database`] on backend failure.
    async fn insert(&self, reservation: &SeatReservation) -> Result<(), StoreError>;

    /// Active reservations held by a booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_active_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<SeatReservation>, StoreError>;

    /// Whether the booking holds any active reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn exists_active(&self, booking_id: &BookingId) -> Result<bool, StoreError>;

    /// Soft-deletes every active reservation of a booking in one statement,
    /// returning how many rows were claimed.
    ///
    /// The count is the claim: when the sweeper and the payment callback race
    /// to release the same booking, exactly one caller observes a non-zero
    /// count and proceeds to return seats.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn soft_delete_by_booking(
        &self,
        booking_id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Active reservations whose `expires_at` has passed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<SeatReservation>, StoreError>;
}

/// Persistence for bookings and their ordered legs.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a booking together with its legs, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IdempotencyConflict`] when the booking's
    /// idempotency key collides with an existing row (a concurrent duplicate
    /// create lost the race), and [`StoreError::Database`] on backend
    /// failure.
    async fn insert(&self, booking: &Booking, legs: &[BookingLeg]) -> Result<(), StoreError>;

    /// Fetches a booking and its legs by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_by_id(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError>;

    /// Fetches the booking created under an idempotency key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError>;

    /// All bookings of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<(Booking, Vec<BookingLeg>)>, StoreError>;

    /// `PENDING` bookings created before `cutoff` (candidates for the
    /// timeout reconciler).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Guarded status transition: moves the booking from `expected` to `to`
    /// and returns whether a row changed.
    ///
    /// `UPDATE … WHERE status = expected` is the single-writer guard for
    /// concurrent payment callbacks: the first to move off `PENDING` wins,
    /// later writers observe `false` and no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn transition_status(
        &self,
        booking_id: &BookingId,
        expected: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError>;

    /// Records the payment processor's reference on the booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend fails.
    async fn set_payment_id(
        &self,
        booking_id: &BookingId,
        payment_id: &str,
    ) -> Result<(), StoreError>;
}
