//! Narrow interfaces to the external collaborators the core consumes.
//!
//! Route search and payment processing are separate services; the core only
//! needs "resolve an identifier to legs and a price" and "fire a payment
//! request". HTTP clients live in `skybook-server`, recording fakes in
//! `skybook-testing`.

use crate::error::AdapterError;
use crate::types::{BookingId, FlightId, FlightIdentifier, Money, UserId};
use async_trait::async_trait;

/// A resolved flight identifier: the ordered legs it denotes and the
/// per-seat price summed across them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Concrete flights, in travel order. A direct identifier resolves to a
    /// single leg.
    pub legs: Vec<FlightId>,
    /// Per-seat price across all legs.
    pub unit_price: Money,
}

/// Read-side facade over the route-search service.
#[async_trait]
pub trait SearchFacade: Send + Sync {
    /// Resolves a direct or computed identifier. `Ok(None)` means the
    /// identifier is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when the service cannot be
    /// reached and [`AdapterError::Protocol`] on an uninterpretable answer.
    async fn resolve(
        &self,
        identifier: &FlightIdentifier,
    ) -> Result<Option<ResolvedRoute>, AdapterError>;
}

/// Fire-and-forget gateway to the asynchronous payment processor.
///
/// The processor reports the terminal outcome later by POSTing a
/// `PaymentCallback` to `callback_url`; the caller never awaits it here.
#[async_trait]
pub trait Payments: Send + Sync {
    /// Requests a payment for a booking.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when the processor cannot be
    /// reached. Callers treat this as non-fatal: the reservation TTL
    /// guarantees eventual cleanup if no callback ever arrives.
    async fn request(
        &self,
        booking_id: &BookingId,
        user_id: &UserId,
        amount: Money,
        callback_url: &str,
    ) -> Result<(), AdapterError>;
}
