//! Error types for the booking core.
//!
//! One error enum per seam, plus the user-facing [`BookingError`] taxonomy.
//! Backend errors carry rendered messages rather than backend error types so
//! this crate stays free of driver dependencies; the adapter crates do the
//! mapping at their boundary.

use crate::types::{BookingId, FlightId};
use thiserror::Error;

/// Failure of a persistence operation (flights, reservations, bookings).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database failed; retryable.
    #[error("database error: {0}")]
    Database(String),

    /// An insert collided with the unique idempotency-key index.
    ///
    /// Surfaced as its own variant so the orchestrator can run the
    /// losing-race cleanup (release inventory, fetch the winner).
    #[error("idempotency key already in use")]
    IdempotencyConflict,

    /// A guarded insert collided with an existing active reservation for the
    /// same `(booking_id, flight_id)` pair.
    #[error("active reservation already exists for booking {0} on flight {1}")]
    DuplicateReservation(BookingId, FlightId),
}

/// Failure of a seat-cache operation.
///
/// The cache is non-authoritative: callers log these and move on.
#[derive(Debug, Error)]
#[error("cache backend error: {0}")]
pub struct CacheError(pub String);

/// Failure of the distributed mutex backend.
///
/// Distinct from failing to win a lock within the wait budget, which is the
/// `Ok(None)` return of the acquire methods.
#[derive(Debug, Error)]
#[error("lock backend error: {0}")]
pub struct LockError(pub String);

/// Failure of an external collaborator (search/pricing, payments).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The dependency could not be reached or answered 5xx; retryable.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    /// The dependency answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Protocol(String),
}

/// The user-facing error taxonomy of the booking surface.
///
/// Every variant maps to a stable error code and a retryability flag; the
/// HTTP layer adds the status code. Kinds, not types: a storage failure and
/// an unexpected state both surface as [`Self::Internal`].
#[derive(Debug, Error)]
pub enum BookingError {
    /// Request failed validation before any side effect.
    #[error("{0}")]
    Validation(String),

    /// The flight identifier is unknown to the search facade.
    #[error("unknown flight identifier: {0}")]
    InvalidFlight(String),

    /// Not enough seats on at least one leg.
    #[error("insufficient seats on flight {flight_id}")]
    NoSeatsAvailable {
        /// First leg that could not be decremented.
        flight_id: FlightId,
    },

    /// The per-flight mutex could not be won within the wait budget.
    #[error("could not acquire flight locks")]
    LockContention,

    /// Search/pricing or the payment adapter is down.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The reservation lapsed before it could be confirmed.
    #[error("reservation expired for booking {0}")]
    ReservationExpired(BookingId),

    /// No booking with this identifier.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// Storage error or invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidFlight(_) => "INVALID_FLIGHT",
            Self::NoSeatsAvailable { .. } => "NO_SEATS_AVAILABLE",
            Self::LockContention => "LOCK_ACQUISITION_FAILED",
            Self::DependencyUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ReservationExpired(_) => "RESERVATION_EXPIRED",
            Self::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client should retry the same request.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::InvalidFlight(_)
            | Self::NoSeatsAvailable { .. }
            | Self::ReservationExpired(_)
            | Self::BookingNotFound(_) => false,
            Self::LockContention | Self::DependencyUnavailable(_) | Self::Internal(_) => true,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AdapterError> for BookingError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unavailable(msg) => Self::DependencyUnavailable(msg),
            AdapterError::Protocol(msg) => Self::Internal(msg),
        }
    }
}
