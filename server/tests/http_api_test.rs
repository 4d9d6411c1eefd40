//! HTTP surface tests: routing, status codes, and error bodies.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{delete, get, post_json, post_json_with_header, world};
use serde_json::json;

#[tokio::test]
async fn booking_happy_path_over_http() {
    let w = world();
    w.seed_direct("FL201", 100);
    let app = w.router();

    let (status, body) = post_json(
        &app,
        "/v1/bookings",
        &json!({ "user_id": "u1", "flight_identifier": "FL201", "seats": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["legs"], json!(["FL201"]));
    assert_eq!(body["no_of_seats"], 2);
    let booking_id = body["booking_id"].as_str().unwrap().to_string();
    assert!(booking_id.starts_with("BK_"));
    assert_eq!(w.available("FL201"), Some(98));

    // Fetch it back.
    let (status, fetched) = get(&app, &format!("/v1/bookings/{booking_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["booking_id"], booking_id.as_str());

    // The payment processor reports success.
    let (status, ack) = post_json(
        &app,
        "/v1/bookings/payment-callback",
        &json!({ "booking_id": booking_id, "payment_id": "pay_1", "status": "SUCCESS" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "PROCESSED");

    let (_, confirmed) = get(&app, &format!("/v1/bookings/{booking_id}")).await;
    assert_eq!(confirmed["status"], "CONFIRMED");

    // The user listing shows it.
    let (status, listing) = get(&app, "/v1/bookings/user/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn idempotency_key_replays_with_200() {
    let w = world();
    w.seed_direct("FL201", 100);
    let app = w.router();
    let body = json!({ "user_id": "u1", "flight_identifier": "FL201", "seats": 2 });

    let (first_status, first) =
        post_json_with_header(&app, "/v1/bookings", ("Idempotency-Key", "K1"), &body).await;
    let (second_status, second) =
        post_json_with_header(&app, "/v1/bookings", ("Idempotency-Key", "K1"), &body).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["booking_id"], second["booking_id"]);
    assert_eq!(w.reservations.active_count(), 1);
}

#[tokio::test]
async fn error_bodies_carry_the_stable_shape() {
    let w = world();
    w.seed_direct("FL101", 1);
    let app = w.router();

    // Not enough seats.
    let (status, body) = post_json(
        &app,
        "/v1/bookings",
        &json!({ "user_id": "u1", "flight_identifier": "FL101", "seats": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NO_SEATS_AVAILABLE");
    assert_eq!(body["details"]["flight_id"], "FL101");
    assert_eq!(body["retryable"], false);
    assert!(body["timestamp"].is_string());

    // Validation.
    let (status, body) = post_json(
        &app,
        "/v1/bookings",
        &json!({ "user_id": "u1", "flight_identifier": "FL101", "seats": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // Unknown identifier.
    let (status, body) = post_json(
        &app,
        "/v1/bookings",
        &json!({ "user_id": "u1", "flight_identifier": "FL404", "seats": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FLIGHT");

    // Unknown booking.
    let (status, body) = get(&app, "/v1/bookings/BK_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "BOOKING_NOT_FOUND");

    // Unknown booking on the callback path.
    let (status, _) = post_json(
        &app,
        "/v1/bookings/payment-callback",
        &json!({ "booking_id": "BK_missing", "status": "SUCCESS" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inventory_surface_lifecycle() {
    let w = world();
    w.seed_direct("FL301", 10);
    let app = w.router();

    // Reserve.
    let (status, body) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({
            "booking_id": "BK_ext1",
            "flight_ids": ["FL301"],
            "seats": 4,
            "ttl_minutes": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["reservation_id"], "BK_ext1");
    assert!(body["expires_at"].is_string());
    assert_eq!(w.available("FL301"), Some(6));

    // Replay answers with the same hold.
    let (status, _) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({
            "booking_id": "BK_ext1",
            "flight_ids": ["FL301"],
            "seats": 4,
            "ttl_minutes": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(w.available("FL301"), Some(6));

    // Oversell is a 409.
    let (status, body) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({
            "booking_id": "BK_ext2",
            "flight_ids": ["FL301"],
            "seats": 7,
            "ttl_minutes": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NO_SEATS_AVAILABLE");

    // Bad input is a 400.
    let (status, body) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({ "booking_id": "BK_ext3", "flight_ids": [], "seats": 1, "ttl_minutes": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    // Confirm retires the hold and keeps the seats.
    let (status, body) = post_json(
        &app,
        "/v1/inventory/confirm",
        &json!({ "booking_id": "BK_ext1", "flight_ids": ["FL301"], "seats": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(w.available("FL301"), Some(6));

    // A second confirm finds nothing to commit.
    let (status, body) = post_json(
        &app,
        "/v1/inventory/confirm",
        &json!({ "booking_id": "BK_ext1" }),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["status"], "expired");
}

#[tokio::test]
async fn inventory_release_answers_200_then_204() {
    let w = world();
    w.seed_direct("FL302", 10);
    let app = w.router();

    let (status, _) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({
            "booking_id": "BK_rel",
            "flight_ids": ["FL302"],
            "seats": 3,
            "ttl_minutes": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(w.available("FL302"), Some(7));

    let (status, body) = delete(&app, "/v1/inventory/release/BK_rel?flight_ids=FL302").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "released");
    assert_eq!(w.available("FL302"), Some(10));

    let (status, _) = delete(&app, "/v1/inventory/release/BK_rel").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn confirm_after_ttl_answers_410() {
    let w = world();
    w.seed_direct("FL303", 10);
    let app = w.router();

    let (status, _) = post_json(
        &app,
        "/v1/inventory/reserve",
        &json!({
            "booking_id": "BK_exp",
            "flight_ids": ["FL303"],
            "seats": 2,
            "ttl_minutes": 1
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    w.clock.advance(Duration::seconds(61));
    let (status, body) = post_json(
        &app,
        "/v1/inventory/confirm",
        &json!({ "booking_id": "BK_exp" }),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["status"], "expired");
}

#[tokio::test]
async fn availability_reads_through_and_repopulates_the_cache() {
    let w = world();
    w.seed_direct("FL401", 42);
    let app = w.router();

    // First read misses the cache and falls back to the store.
    let (status, body) = get(&app, "/v1/flights/FL401/availability").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_seats"], 42);
    assert_eq!(body["cached"], false);

    // Second read is served from the repopulated cache.
    let (status, body) = get(&app, "/v1/flights/FL401/availability").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);

    let (status, body) = get(&app, "/v1/flights/FL999/availability").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "FLIGHT_NOT_FOUND");
}

#[tokio::test]
async fn min_availability_is_conservative_on_cache_misses() {
    let w = world();
    w.seed_direct("FL501", 20);
    w.seed_direct("FL502", 3);
    let app = w.router();

    // Nothing cached yet: the conservative answer is zero.
    let (status, body) = post_json(
        &app,
        "/v1/flights/availability/min",
        &json!({ "flight_ids": ["FL501", "FL502"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["min_available_seats"], 0);

    // Warm both entries through the read-through path.
    get(&app, "/v1/flights/FL501/availability").await;
    get(&app, "/v1/flights/FL502/availability").await;

    let (_, body) = post_json(
        &app,
        "/v1/flights/availability/min",
        &json!({ "flight_ids": ["FL501", "FL502"] }),
    )
    .await;
    assert_eq!(body["min_available_seats"], 3);
}

#[tokio::test]
async fn health_probes_answer() {
    let w = world();
    let app = w.router();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
