//! Booking API endpoints.
//!
//! - `POST /v1/bookings` — create (201, or 200 on idempotent replay)
//! - `GET /v1/bookings/:id` — fetch one
//! - `GET /v1/bookings/user/:user_id` — list a user's bookings
//! - `POST /v1/bookings/payment-callback` — payment processor webhook

use crate::error::ApiError;
use crate::orchestrator::{BookingEntry, CreateBookingRequest};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::json;
use skybook_core::types::{BookingId, PaymentCallback, UserId};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Create a booking.
///
/// An optional `Idempotency-Key` header collapses retried creates onto a
/// single booking: the first request answers 201, replays answer 200 with
/// the same projection.
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingEntry>), ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let created = state
        .orchestrator
        .create_booking(request, idempotency_key)
        .await?;

    let status = if created.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(created.entry)))
}

/// Fetch one booking.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingEntry>, ApiError> {
    let entry = state
        .orchestrator
        .get_booking(&BookingId::new(booking_id))
        .await?;
    Ok(Json(entry))
}

/// List a user's bookings, newest first.
pub async fn list_user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingEntry>>, ApiError> {
    let entries = state
        .orchestrator
        .list_user_bookings(&UserId::new(user_id))
        .await?;
    Ok(Json(entries))
}

/// Payment processor webhook.
///
/// Duplicate deliveries and unknown status strings are acknowledged and
/// ignored; only an unknown booking id is an error.
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.orchestrator.on_payment_callback(callback).await?;
    Ok(Json(json!({ "status": "PROCESSED" })))
}
