//! HTTP clients for the external search and payment services.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use skybook_core::adapters::{Payments, ResolvedRoute, SearchFacade};
use skybook_core::error::AdapterError;
use skybook_core::types::{BookingId, FlightId, FlightIdentifier, Money, UserId};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn http_client() -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AdapterError::Unavailable(format!("http client build failed: {e}")))
}

// ============================================================================
// Search
// ============================================================================

/// Wire shape of the search service's resolve answer.
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    legs: Vec<String>,
    unit_price_cents: u64,
}

/// [`SearchFacade`] over the route-search service's HTTP API.
#[derive(Clone)]
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    /// Creates a client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, AdapterError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchFacade for HttpSearchClient {
    async fn resolve(
        &self,
        identifier: &FlightIdentifier,
    ) -> Result<Option<ResolvedRoute>, AdapterError> {
        let url = format!("{}/v1/search/resolve/{}", self.base_url, identifier);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("search unreachable: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: ResolveResponse = response
                    .json()
                    .await
                    .map_err(|e| AdapterError::Protocol(format!("bad resolve body: {e}")))?;
                debug!(identifier = %identifier, legs = body.legs.len(), "identifier resolved");
                Ok(Some(ResolvedRoute {
                    legs: body.legs.into_iter().map(FlightId::new).collect(),
                    unit_price: Money::from_cents(body.unit_price_cents),
                }))
            }
            status => Err(AdapterError::Unavailable(format!(
                "search answered {status}"
            ))),
        }
    }
}

// ============================================================================
// Payments
// ============================================================================

/// Wire shape of the payment request.
#[derive(Debug, Serialize)]
struct PaymentRequestBody<'a> {
    booking_id: &'a BookingId,
    user_id: &'a UserId,
    amount_cents: u64,
    callback_url: &'a str,
}

/// [`Payments`] over the payment processor's HTTP API.
///
/// Fire-and-forget: a 2xx acknowledgement means the processor accepted the
/// request; the terminal outcome arrives later on the callback endpoint.
#[derive(Clone)]
pub struct HttpPaymentsClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPaymentsClient {
    /// Creates a client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, AdapterError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Payments for HttpPaymentsClient {
    async fn request(
        &self,
        booking_id: &BookingId,
        user_id: &UserId,
        amount: Money,
        callback_url: &str,
    ) -> Result<(), AdapterError> {
        let url = format!("{}/v1/payments", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&PaymentRequestBody {
                booking_id,
                user_id,
                amount_cents: amount.cents(),
                callback_url,
            })
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("payments unreachable: {e}")))?;

        if response.status().is_success() {
            debug!(booking_id = %booking_id, amount_cents = amount.cents(), "payment requested");
            Ok(())
        } else {
            Err(AdapterError::Unavailable(format!(
                "payments answered {}",
                response.status()
            )))
        }
    }
}
