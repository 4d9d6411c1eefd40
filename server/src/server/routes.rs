//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{bookings, flights, inventory};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the complete router: booking surface, inventory surface, flight
/// availability reads, and health probes.
pub fn build_router(state: AppState) -> Router {
    let booking_routes = Router::new()
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/user/:user_id", get(bookings::list_user_bookings))
        .route(
            "/bookings/payment-callback",
            post(bookings::payment_callback),
        );

    let inventory_routes = Router::new()
        .route("/inventory/reserve", post(inventory::reserve))
        .route("/inventory/confirm", post(inventory::confirm))
        .route("/inventory/release/:booking_id", delete(inventory::release));

    let flight_routes = Router::new()
        .route("/flights/:id/availability", get(flights::get_availability))
        .route("/flights/availability/min", post(flights::min_availability));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest(
            "/v1",
            booking_routes.merge(inventory_routes).merge(flight_routes),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
