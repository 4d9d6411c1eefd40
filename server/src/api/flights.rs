//! Flight availability endpoints (the search read side).
//!
//! - `GET /v1/flights/:id/availability` — read-through single-flight count
//! - `POST /v1/flights/availability/min` — minimum across a leg list

use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use skybook_core::types::FlightId;

/// Availability answer for one flight.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// The flight queried.
    pub flight_id: FlightId,
    /// Current (possibly seconds-stale) seat count.
    pub available_seats: u32,
    /// Whether the answer came from the cache or the store of record.
    pub cached: bool,
}

/// Read-through availability: cache hit answers directly; a miss reads the
/// store of record and repopulates the cache.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(flight_id): Path<String>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let flight_id = FlightId::new(flight_id);

    match state.cache.get(&flight_id).await {
        Ok(Some(available_seats)) => {
            return Ok(Json(AvailabilityResponse {
                flight_id,
                available_seats,
                cached: true,
            }));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(flight_id = %flight_id, error = %e, "cache read failed, falling back");
        }
    }

    let flight = state
        .flights
        .get(&flight_id)
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                e.to_string(),
                true,
            )
        })?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "FLIGHT_NOT_FOUND",
                format!("flight {flight_id} not found"),
                false,
            )
        })?;

    if let Err(e) = state.cache.set(&flight_id, flight.available_seats).await {
        tracing::debug!(flight_id = %flight_id, error = %e, "cache repopulation failed");
    }

    Ok(Json(AvailabilityResponse {
        flight_id,
        available_seats: flight.available_seats,
        cached: false,
    }))
}

/// Body of a minimum-availability query.
#[derive(Debug, Deserialize)]
pub struct MinAvailabilityRequest {
    /// Legs of the candidate route.
    pub flight_ids: Vec<String>,
}

/// Answer of a minimum-availability query.
#[derive(Debug, Serialize)]
pub struct MinAvailabilityResponse {
    /// Minimum cached seat count across the legs; 0 when any leg is
    /// uncached (the conservative answer for search filtering).
    pub min_available_seats: u32,
}

/// Minimum cached availability across a leg list, for search filtering.
pub async fn min_availability(
    State(state): State<AppState>,
    Json(request): Json<MinAvailabilityRequest>,
) -> Result<Json<MinAvailabilityResponse>, ApiError> {
    if request.flight_ids.is_empty() {
        return Err(ApiError::invalid_input("flight_ids must not be empty"));
    }
    let legs: Vec<FlightId> = request.flight_ids.into_iter().map(FlightId::new).collect();
    let min_available_seats = state.cache.min_across(&legs).await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            e.to_string(),
            true,
        )
    })?;
    Ok(Json(MinAvailabilityResponse { min_available_seats }))
}
