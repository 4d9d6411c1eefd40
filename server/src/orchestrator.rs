//! The booking orchestrator.
//!
//! Public surface of the booking core: idempotent booking creation, payment
//! callback reconciliation, and the periodic expiry tick. The orchestrator
//! owns `bookings.status` exclusively; every transition is guarded by a
//! compare-and-set on the current status, which makes duplicate payment
//! callbacks and racing reconcilers single-winner by construction.

use crate::metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skybook_core::adapters::{Payments, SearchFacade};
use skybook_core::clock::Clock;
use skybook_core::config::BookingConfig;
use skybook_core::error::{BookingError, StoreError};
use skybook_core::stores::BookingStore;
use skybook_core::types::{
    Booking, BookingId, BookingLeg, BookingStatus, FlightId, FlightIdentifier, Money,
    PaymentCallback, PaymentOutcome, UserId,
};
use skybook_engine::{InventoryEngine, ReserveOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A validated booking creation request.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Requesting user.
    pub user_id: String,
    /// Direct flight id or `CF_` computed-route id.
    pub flight_identifier: String,
    /// Seats to book on every leg.
    pub seats: u32,
}

/// Client-facing projection of a booking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingEntry {
    /// Booking identifier.
    pub booking_id: BookingId,
    /// Owning user.
    pub user_id: UserId,
    /// Direct or computed.
    pub flight_type: skybook_core::types::FlightType,
    /// The identifier the booking was created against.
    pub flight_identifier: FlightIdentifier,
    /// Seats per leg.
    pub no_of_seats: u32,
    /// Total price in cents.
    pub total_price: Money,
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// Concrete leg flight ids, in route order.
    pub legs: Vec<FlightId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl BookingEntry {
    fn from_parts(booking: Booking, legs: Vec<BookingLeg>) -> Self {
        let mut legs = legs;
        legs.sort_by_key(|l| l.leg_order);
        Self {
            booking_id: booking.booking_id,
            user_id: booking.user_id,
            flight_type: booking.flight_type,
            flight_identifier: booking.flight_identifier,
            no_of_seats: booking.no_of_seats,
            total_price: booking.total_price,
            status: booking.status,
            legs: legs.into_iter().map(|l| l.flight_id).collect(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Result of a create call: the projection plus whether it was an
/// idempotent replay of an earlier create.
#[derive(Clone, Debug)]
pub struct CreatedBooking {
    /// The booking projection.
    pub entry: BookingEntry,
    /// `true` when an existing booking was returned for the same
    /// idempotency key (HTTP 200 instead of 201).
    pub replayed: bool,
}

/// Outcome summary of one expiry tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpiryTickReport {
    /// Bookings released by the inventory sweep (pass A).
    pub holds_released: usize,
    /// Pending bookings moved to `TIMEOUT` (pass B).
    pub bookings_timed_out: usize,
}

/// Drives the CLAIM → PAY → CONFIRM booking lifecycle.
pub struct Orchestrator {
    bookings: Arc<dyn BookingStore>,
    engine: Arc<InventoryEngine>,
    search: Arc<dyn SearchFacade>,
    payments: Arc<dyn Payments>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
    callback_url: String,
}

impl Orchestrator {
    /// Wires the orchestrator to its collaborators.
    ///
    /// `callback_base_url` is this service's public base URL; the payment
    /// processor POSTs its outcome to
    /// `{callback_base_url}/v1/bookings/payment-callback`.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        engine: Arc<InventoryEngine>,
        search: Arc<dyn SearchFacade>,
        payments: Arc<dyn Payments>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
        callback_base_url: &str,
    ) -> Self {
        let callback_url = format!(
            "{}/v1/bookings/payment-callback",
            callback_base_url.trim_end_matches('/')
        );
        Self {
            bookings,
            engine,
            search,
            payments,
            clock,
            config,
            callback_url,
        }
    }

    // ========================================================================
    // create_booking
    // ========================================================================

    /// Creates a booking: resolve → reserve → persist → request payment.
    ///
    /// With a non-empty `idempotency_key`, retried creates collapse onto the
    /// first booking — replays return the stored projection unchanged.
    ///
    /// # Errors
    ///
    /// See the [`BookingError`] taxonomy; no partial state survives any
    /// error path (inventory reserved for a booking that failed to persist
    /// is released immediately, and the TTL sweep backstops a crash).
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        idempotency_key: Option<String>,
    ) -> Result<CreatedBooking, BookingError> {
        self.validate(&request)?;
        let idempotency_key = idempotency_key.filter(|k| !k.is_empty());

        if let Some(key) = idempotency_key.as_deref() {
            if let Some((booking, legs)) = self.bookings.find_by_idempotency_key(key).await? {
                debug!(booking_id = %booking.booking_id, key, "idempotent create replay");
                return Ok(CreatedBooking {
                    entry: BookingEntry::from_parts(booking, legs),
                    replayed: true,
                });
            }
        }

        let identifier = FlightIdentifier::new(request.flight_identifier.clone());
        let route = self
            .search
            .resolve(&identifier)
            .await?
            .ok_or_else(|| BookingError::InvalidFlight(identifier.to_string()))?;
        if route.legs.is_empty() {
            return Err(BookingError::InvalidFlight(identifier.to_string()));
        }

        let total_price = route
            .unit_price
            .checked_multiply(request.seats)
            .ok_or_else(|| BookingError::Internal("price overflow".to_string()))?;

        let booking_id = BookingId::generate();
        let reserve_ttl = self.config.reserve_ttl();
        match self
            .engine
            .reserve(&booking_id, &route.legs, request.seats, reserve_ttl)
            .await
        {
            ReserveOutcome::Success { .. } => {}
            ReserveOutcome::NoSeats { flight_id } => {
                return Err(BookingError::NoSeatsAvailable { flight_id });
            }
            ReserveOutcome::LockFailed => return Err(BookingError::LockContention),
            ReserveOutcome::AlreadyReserved { .. } => {
                // A fresh booking id can never carry a prior hold.
                return Err(BookingError::Internal(
                    "fresh booking id already holds a reservation".to_string(),
                ));
            }
            ReserveOutcome::Internal => {
                return Err(BookingError::Internal("reservation failed".to_string()));
            }
        }

        let now = self.clock.now();
        let booking = Booking {
            booking_id: booking_id.clone(),
            user_id: UserId::new(request.user_id.clone()),
            flight_type: identifier.flight_type(),
            flight_identifier: identifier,
            no_of_seats: request.seats,
            total_price,
            status: BookingStatus::Pending,
            idempotency_key: idempotency_key.clone(),
            payment_id: None,
            created_at: now,
            updated_at: now,
        };
        let legs: Vec<BookingLeg> = route
            .legs
            .iter()
            .enumerate()
            .map(|(order, flight_id)| BookingLeg {
                booking_id: booking_id.clone(),
                flight_id: flight_id.clone(),
                leg_order: u32::try_from(order).unwrap_or(u32::MAX),
            })
            .collect();

        match self.bookings.insert(&booking, &legs).await {
            Ok(()) => {}
            Err(StoreError::IdempotencyConflict) => {
                // A concurrent duplicate won the unique index; drop our
                // inventory and hand back the winner's booking.
                info!(booking_id = %booking_id, "lost idempotency race, releasing inventory");
                self.engine.release(&booking_id).await;
                let key = idempotency_key.as_deref().unwrap_or_default();
                let (winner, winner_legs) = self
                    .bookings
                    .find_by_idempotency_key(key)
                    .await?
                    .ok_or_else(|| {
                        BookingError::Internal("idempotency winner vanished".to_string())
                    })?;
                return Ok(CreatedBooking {
                    entry: BookingEntry::from_parts(winner, winner_legs),
                    replayed: true,
                });
            }
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "booking insert failed, releasing inventory");
                self.engine.release(&booking_id).await;
                return Err(e.into());
            }
        }

        // Fire-and-forget: a down processor is not fatal, the reservation
        // TTL guarantees cleanup if no callback ever arrives.
        if let Err(e) = self
            .payments
            .request(
                &booking_id,
                &booking.user_id,
                total_price,
                &self.callback_url,
            )
            .await
        {
            warn!(booking_id = %booking_id, error = %e, "payment request failed; awaiting TTL");
        }

        metrics::booking_created();
        info!(
            booking_id = %booking_id,
            user_id = %booking.user_id,
            seats = booking.no_of_seats,
            total_cents = booking.total_price.cents(),
            "booking created"
        );
        Ok(CreatedBooking {
            entry: BookingEntry::from_parts(booking, legs),
            replayed: false,
        })
    }

    // ========================================================================
    // payment callback
    // ========================================================================

    /// Applies the payment processor's terminal outcome to a booking.
    ///
    /// Idempotent: a booking already in a terminal status ignores further
    /// callbacks, and unknown status strings are logged and dropped.
    ///
    /// # Errors
    ///
    /// [`BookingError::BookingNotFound`] for an unknown booking id;
    /// [`BookingError::Internal`] when storage fails (the booking stays
    /// `PENDING` and the reconciler will pick it up).
    pub async fn on_payment_callback(
        &self,
        callback: PaymentCallback,
    ) -> Result<(), BookingError> {
        let (booking, _) = self
            .bookings
            .find_by_id(&callback.booking_id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(callback.booking_id.clone()))?;

        if booking.status != BookingStatus::Pending {
            debug!(
                booking_id = %booking.booking_id,
                status = booking.status.as_str(),
                "duplicate payment callback ignored"
            );
            return Ok(());
        }

        let Some(outcome) = callback.outcome() else {
            warn!(
                booking_id = %booking.booking_id,
                status = %callback.status,
                "unknown payment status ignored"
            );
            return Ok(());
        };

        if let Some(payment_id) = callback.payment_id.as_deref() {
            self.bookings
                .set_payment_id(&booking.booking_id, payment_id)
                .await?;
        }

        match outcome {
            PaymentOutcome::Success => {
                if self.engine.confirm(&booking.booking_id).await {
                    self.transition(&booking.booking_id, BookingStatus::Confirmed)
                        .await?;
                    metrics::booking_confirmed();
                    info!(booking_id = %booking.booking_id, "booking confirmed");
                } else {
                    // The hold lapsed before payment landed; the user has to
                    // start over.
                    self.transition(&booking.booking_id, BookingStatus::Failed)
                        .await?;
                    metrics::booking_failed();
                    info!(booking_id = %booking.booking_id, "payment arrived after expiry, booking failed");
                }
            }
            PaymentOutcome::Failure | PaymentOutcome::Timeout => {
                self.transition(&booking.booking_id, BookingStatus::Failed)
                    .await?;
                // Best-effort: the sweeper releases anything we miss.
                self.engine.release(&booking.booking_id).await;
                metrics::booking_failed();
                info!(
                    booking_id = %booking.booking_id,
                    outcome = %callback.status,
                    "payment did not succeed, booking failed"
                );
            }
        }
        Ok(())
    }

    async fn transition(
        &self,
        booking_id: &BookingId,
        to: BookingStatus,
    ) -> Result<(), BookingError> {
        let moved = self
            .bookings
            .transition_status(booking_id, BookingStatus::Pending, to)
            .await?;
        if !moved {
            // Another writer won the guard; terminal states are absorbing.
            debug!(booking_id = %booking_id, to = to.as_str(), "status transition lost the guard");
        }
        Ok(())
    }

    // ========================================================================
    // expiry tick
    // ========================================================================

    /// Runs both background passes once: the inventory sweep, then the
    /// pending-booking timeout reconcile. Each pass is independently safe
    /// and individually schedulable.
    pub async fn on_expiry_tick(&self) -> ExpiryTickReport {
        let sweep = self.engine.sweep_expired(self.clock.now()).await;
        let timed_out = self.reconcile_pending().await;
        ExpiryTickReport {
            holds_released: sweep.released_bookings,
            bookings_timed_out: timed_out,
        }
    }

    /// Pass B: pending bookings older than the reservation TTL whose
    /// inventory is already gone become `TIMEOUT`.
    pub async fn reconcile_pending(&self) -> usize {
        let cutoff = self.clock.now() - self.config.reserve_ttl();
        let stale = match self.bookings.find_pending_older_than(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(error = %e, "pending-booking scan failed");
                return 0;
            }
        };

        let mut timed_out = 0;
        for booking in stale {
            if self.engine.has_active_hold(&booking.booking_id).await {
                // The sweeper has not reclaimed it yet; next tick will.
                continue;
            }
            match self
                .bookings
                .transition_status(
                    &booking.booking_id,
                    BookingStatus::Pending,
                    BookingStatus::Timeout,
                )
                .await
            {
                Ok(true) => {
                    timed_out += 1;
                    metrics::booking_timed_out();
                    info!(booking_id = %booking.booking_id, "booking timed out");
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(booking_id = %booking.booking_id, error = %e, "timeout transition failed");
                }
            }
        }
        timed_out
    }

    // ========================================================================
    // queries
    // ========================================================================

    /// Fetches one booking projection.
    ///
    /// # Errors
    ///
    /// [`BookingError::BookingNotFound`] for an unknown id.
    pub async fn get_booking(&self, booking_id: &BookingId) -> Result<BookingEntry, BookingError> {
        let (booking, legs) = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.clone()))?;
        Ok(BookingEntry::from_parts(booking, legs))
    }

    /// Lists a user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// [`BookingError::Internal`] when storage fails.
    pub async fn list_user_bookings(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BookingEntry>, BookingError> {
        let found = self.bookings.find_by_user(user_id).await?;
        Ok(found
            .into_iter()
            .map(|(booking, legs)| BookingEntry::from_parts(booking, legs))
            .collect())
    }

    fn validate(&self, request: &CreateBookingRequest) -> Result<(), BookingError> {
        if request.user_id.trim().is_empty() {
            return Err(BookingError::Validation("user_id must not be empty".to_string()));
        }
        if request.flight_identifier.trim().is_empty() {
            return Err(BookingError::Validation(
                "flight_identifier must not be empty".to_string(),
            ));
        }
        let min = self.config.min_seats_per_booking;
        let max = self.config.max_seats_per_booking;
        if request.seats < min || request.seats > max {
            return Err(BookingError::Validation(format!(
                "seats must be between {min} and {max}"
            )));
        }
        Ok(())
    }
}
