//! Inventory API endpoints (the engine's direct HTTP surface).
//!
//! - `POST /v1/inventory/reserve`
//! - `POST /v1/inventory/confirm`
//! - `DELETE /v1/inventory/release/:booking_id`
//!
//! This surface speaks in terms of raw booking/flight ids: it is consumed by
//! internal services that manage their own booking records and only need the
//! hold semantics.

use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skybook_core::types::{BookingId, FlightId};
use skybook_engine::ReserveOutcome;

/// Body of a reserve call.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    /// Booking to hold seats for.
    pub booking_id: String,
    /// Legs to hold, in route order.
    pub flight_ids: Vec<String>,
    /// Seats per leg.
    pub seats: u32,
    /// Hold TTL in minutes.
    pub ttl_minutes: u32,
}

/// Body of a successful reserve answer.
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    /// Always `true` on the 200 path.
    pub success: bool,
    /// The hold's reference (the booking id; one hold per booking).
    pub reservation_id: String,
    /// When the hold lapses.
    pub expires_at: DateTime<Utc>,
}

/// Body of a confirm call. `flight_ids` and `seats` are accepted for wire
/// compatibility but the hold itself is authoritative.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// Booking whose hold to confirm.
    pub booking_id: String,
    /// Ignored; the stored reservation rows decide.
    #[serde(default)]
    pub flight_ids: Vec<String>,
    /// Ignored; the stored reservation rows decide.
    #[serde(default)]
    pub seats: Option<u32>,
}

/// Reserve seats across one or more legs, all-or-nothing.
pub async fn reserve(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<Json<ReserveResponse>, ApiError> {
    if request.booking_id.trim().is_empty() {
        return Err(ApiError::invalid_input("booking_id must not be empty"));
    }
    if request.flight_ids.is_empty() {
        return Err(ApiError::invalid_input("flight_ids must not be empty"));
    }
    if request.seats == 0 {
        return Err(ApiError::invalid_input("seats must be positive"));
    }
    if request.ttl_minutes == 0 {
        return Err(ApiError::invalid_input("ttl_minutes must be positive"));
    }

    let booking_id = BookingId::new(request.booking_id);
    let legs: Vec<FlightId> = request.flight_ids.into_iter().map(FlightId::new).collect();
    let ttl = Duration::minutes(i64::from(request.ttl_minutes));

    let outcome = state
        .engine
        .reserve(&booking_id, &legs, request.seats, ttl)
        .await;
    match outcome {
        ReserveOutcome::Success { expires_at }
        | ReserveOutcome::AlreadyReserved { expires_at } => Ok(Json(ReserveResponse {
            success: true,
            reservation_id: booking_id.to_string(),
            expires_at,
        })),
        ReserveOutcome::NoSeats { flight_id } => Err(ApiError::new(
            StatusCode::CONFLICT,
            "NO_SEATS_AVAILABLE",
            format!("insufficient seats on flight {flight_id}"),
            false,
        )
        .with_details(json!({ "flight_id": flight_id }))),
        ReserveOutcome::LockFailed => Err(ApiError::new(
            StatusCode::CONFLICT,
            "LOCK_FAILED",
            "could not acquire flight locks",
            true,
        )),
        ReserveOutcome::Internal => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "reservation failed",
            true,
        )),
    }
}

/// Confirm a hold after payment: 200 `confirmed`, or 410 `expired` when the
/// hold already lapsed or was released.
pub async fn confirm(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let booking_id = BookingId::new(request.booking_id);
    if state.engine.confirm(&booking_id).await {
        (StatusCode::OK, Json(json!({ "status": "confirmed" })))
    } else {
        (StatusCode::GONE, Json(json!({ "status": "expired" })))
    }
}

/// Query string of a release call (`flight_ids` accepted for compatibility).
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseQuery {
    /// Ignored; the stored reservation rows decide.
    #[serde(default)]
    pub flight_ids: Option<String>,
}

/// Release a hold explicitly: 200 `released`, or 204 when nothing was held.
pub async fn release(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
    axum::extract::Query(_query): axum::extract::Query<ReleaseQuery>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let booking_id = BookingId::new(booking_id);
    if state.engine.release(&booking_id).await {
        (StatusCode::OK, Json(json!({ "status": "released" }))).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
