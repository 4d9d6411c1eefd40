//! Seat-availability cache seam.

use crate::error::CacheError;
use crate::types::FlightId;
use async_trait::async_trait;

/// Denormalized current-availability cache keyed by flight.
///
/// Non-authoritative: a disposable projection of the flight store, written
/// through by the inventory engine after every committed seat mutation. A
/// few seconds of staleness is acceptable for the search read side; on a
/// miss, consumers repopulate from the flight store themselves.
#[async_trait]
pub trait SeatCache: Send + Sync {
    /// Cached seat count for a flight, `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn get(&self, flight_id: &FlightId) -> Result<Option<u32>, CacheError>;

    /// Overwrites the cached seat count.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn set(&self, flight_id: &FlightId, seats: u32) -> Result<(), CacheError>;

    /// Drops the cached entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn delete(&self, flight_id: &FlightId) -> Result<(), CacheError>;

    /// Adds `by` seats to the cached count.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn increment(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError>;

    /// Removes `by` seats from the cached count.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn decrement(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError>;

    /// Minimum cached count across `flight_ids`; 0 when any flight has no
    /// cached value (the conservative answer for availability filtering).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend fails.
    async fn min_across(&self, flight_ids: &[FlightId]) -> Result<u32, CacheError>;
}
