//! HTTP error responses.
//!
//! Bridges the domain's [`BookingError`] taxonomy to axum responses. Every
//! error body carries a stable code, a human message, optional details, a
//! retryability flag, and a timestamp:
//!
//! ```json
//! {
//!   "error": "NO_SEATS_AVAILABLE",
//!   "message": "insufficient seats on flight FL101",
//!   "details": { "flight_id": "FL101" },
//!   "retryable": false,
//!   "timestamp": "2024-05-01T12:00:00Z"
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use skybook_core::BookingError;
use std::fmt;

/// An HTTP-mappable application error.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
    details: Option<serde_json::Value>,
    retryable: bool,
}

impl ApiError {
    /// Creates an error with an explicit status and code.
    #[must_use]
    pub fn new(
        status: StatusCode,
        error: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            details: None,
            retryable,
        }
    }

    /// Attaches machine-readable details to the body.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// A 400 with code `INVALID_INPUT` (inventory surface validation).
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message, false)
    }

    /// The HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The stable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.error
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error, self.message)
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let status = match &err {
            BookingError::Validation(_) | BookingError::InvalidFlight(_) => {
                StatusCode::BAD_REQUEST
            }
            BookingError::NoSeatsAvailable { .. } | BookingError::LockContention => {
                StatusCode::CONFLICT
            }
            BookingError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::ReservationExpired(_) => StatusCode::GONE,
            BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match &err {
            BookingError::NoSeatsAvailable { flight_id } => {
                Some(serde_json::json!({ "flight_id": flight_id }))
            }
            _ => None,
        };

        Self {
            status,
            error: err.code().to_string(),
            message: err.to_string(),
            details,
            retryable: err.retryable(),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    retryable: bool,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = %self.error, message = %self.message, "request failed");
        }

        let body = ErrorBody {
            error: self.error,
            message: self.message,
            details: self.details,
            retryable: self.retryable,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}
