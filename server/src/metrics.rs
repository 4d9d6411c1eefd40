//! Metric counters for the booking hot paths.
//!
//! Emitted through the `metrics` facade; wiring an exporter is a deployment
//! concern and intentionally not done here.

/// A booking reached `PENDING`.
pub fn booking_created() {
    metrics::counter!("skybook_bookings_created_total").increment(1);
}

/// A booking reached `CONFIRMED`.
pub fn booking_confirmed() {
    metrics::counter!("skybook_bookings_confirmed_total").increment(1);
}

/// A booking reached `FAILED`.
pub fn booking_failed() {
    metrics::counter!("skybook_bookings_failed_total").increment(1);
}

/// A booking reached `TIMEOUT`.
pub fn booking_timed_out() {
    metrics::counter!("skybook_bookings_timed_out_total").increment(1);
}

/// Holds released by one sweep pass.
pub fn sweep_released(count: usize) {
    metrics::counter!("skybook_sweep_released_total")
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
}
