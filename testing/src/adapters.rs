//! Test doubles for the external collaborators.

use async_trait::async_trait;
use skybook_core::adapters::{Payments, ResolvedRoute, SearchFacade};
use skybook_core::error::AdapterError;
use skybook_core::types::{BookingId, FlightIdentifier, Money, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// [`SearchFacade`] answering from a fixed routing table.
#[derive(Debug, Default)]
pub struct StaticSearchFacade {
    routes: Mutex<HashMap<FlightIdentifier, ResolvedRoute>>,
    unavailable: AtomicBool,
}

impl StaticSearchFacade {
    /// Creates an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolvable identifier.
    pub fn put(&self, identifier: FlightIdentifier, route: ResolvedRoute) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier, route);
    }

    /// Makes every subsequent `resolve` fail as unavailable (or restores it).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchFacade for StaticSearchFacade {
    async fn resolve(
        &self,
        identifier: &FlightIdentifier,
    ) -> Result<Option<ResolvedRoute>, AdapterError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable("search facade down".to_string()));
        }
        Ok(self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned())
    }
}

/// One captured payment request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedPaymentRequest {
    /// Booking the payment was requested for.
    pub booking_id: BookingId,
    /// Paying user.
    pub user_id: UserId,
    /// Amount requested.
    pub amount: Money,
    /// Callback URL handed to the processor.
    pub callback_url: String,
}

/// [`Payments`] double that records requests instead of sending them.
///
/// Tests deliver the terminal outcome themselves by POSTing (or calling)
/// the orchestrator's payment-callback path.
#[derive(Debug, Default)]
pub struct RecordingPayments {
    requests: Mutex<Vec<RecordedPaymentRequest>>,
    unavailable: AtomicBool,
}

impl RecordingPayments {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedPaymentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes every subsequent `request` fail as unavailable (or restores it).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl Payments for RecordingPayments {
    async fn request(
        &self,
        booking_id: &BookingId,
        user_id: &UserId,
        amount: Money,
        callback_url: &str,
    ) -> Result<(), AdapterError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable("payment processor down".to_string()));
        }
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedPaymentRequest {
                booking_id: booking_id.clone(),
                user_id: user_id.clone(),
                amount,
                callback_url: callback_url.to_string(),
            });
        Ok(())
    }
}
