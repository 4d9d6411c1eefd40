//! Shared harness for the server test suites: a fully in-memory world wired
//! exactly like the composition root, plus small HTTP drivers.

#![allow(dead_code, clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use skybook_core::adapters::ResolvedRoute;
use skybook_core::clock::Clock;
use skybook_core::config::BookingConfig;
use skybook_core::types::{FlightId, FlightIdentifier, Money};
use skybook_engine::InventoryEngine;
use skybook_server::{build_router, AppState, Orchestrator};
use skybook_testing::{
    test_flight, InMemoryBookingStore, InMemoryFlightMutex, InMemoryFlightStore,
    InMemoryReservationStore, InMemorySeatCache, ManualClock, RecordingPayments,
    StaticSearchFacade,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const CALLBACK_BASE: &str = "http://booking.test";

/// One fully wired in-memory deployment.
pub struct TestWorld {
    pub flights: Arc<InMemoryFlightStore>,
    pub reservations: Arc<InMemoryReservationStore>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub cache: Arc<InMemorySeatCache>,
    pub clock: Arc<ManualClock>,
    pub search: Arc<StaticSearchFacade>,
    pub payments: Arc<RecordingPayments>,
    pub engine: Arc<InventoryEngine>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn test_config() -> BookingConfig {
    BookingConfig {
        reserve_ttl_minutes: 5,
        sweep_interval_seconds: 10,
        lock_ttl_seconds: 10,
        lock_wait_seconds: 1,
        lock_retry_delay_ms: 5,
        max_seats_per_booking: 9,
        min_seats_per_booking: 1,
        booking_reconcile_interval_seconds: 30,
    }
}

pub fn world() -> TestWorld {
    let flights = Arc::new(InMemoryFlightStore::new());
    let reservations = Arc::new(InMemoryReservationStore::new());
    let bookings = Arc::new(InMemoryBookingStore::new());
    let cache = Arc::new(InMemorySeatCache::new());
    let clock = Arc::new(ManualClock::start_now());
    let search = Arc::new(StaticSearchFacade::new());
    let payments = Arc::new(RecordingPayments::new());

    let engine = Arc::new(InventoryEngine::new(
        flights.clone(),
        reservations.clone(),
        cache.clone(),
        Arc::new(InMemoryFlightMutex::new()),
        clock.clone(),
        &test_config(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        bookings.clone(),
        engine.clone(),
        search.clone(),
        payments.clone(),
        clock.clone(),
        test_config(),
        CALLBACK_BASE,
    ));

    TestWorld {
        flights,
        reservations,
        bookings,
        cache,
        clock,
        search,
        payments,
        engine,
        orchestrator,
    }
}

impl TestWorld {
    /// The full HTTP router over this world.
    pub fn router(&self) -> Router {
        build_router(AppState::new(
            self.orchestrator.clone(),
            self.engine.clone(),
            self.flights.clone(),
            self.cache.clone(),
        ))
    }

    /// Seeds a bookable direct flight and registers it with the search
    /// facade at 10 000 cents per seat (the `test_flight` price).
    pub fn seed_direct(&self, flight_id: &str, seats: u32) {
        self.flights.put(test_flight(flight_id, seats));
        self.search.put(
            FlightIdentifier::new(flight_id),
            ResolvedRoute {
                legs: vec![FlightId::new(flight_id)],
                unit_price: Money::from_cents(10_000),
            },
        );
    }

    /// Seeds a computed route over already-seeded legs.
    pub fn seed_route(&self, identifier: &str, legs: &[&str], unit_price_cents: u64) {
        self.search.put(
            FlightIdentifier::new(identifier),
            ResolvedRoute {
                legs: legs.iter().map(|id| FlightId::new(*id)).collect(),
                unit_price: Money::from_cents(unit_price_cents),
            },
        );
    }

    pub fn available(&self, flight_id: &str) -> Option<u32> {
        self.flights.available(&FlightId::new(flight_id))
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

// ============================================================================
// HTTP drivers
// ============================================================================

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(router, request).await
}

pub async fn post_json_with_header(
    router: &Router,
    uri: &str,
    header: (&str, &str),
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(header.0, header.1)
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(router, request).await
}

pub async fn delete(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}
