//! # Skybook Store
//!
//! `PostgreSQL` persistence for the booking core: flights (with the
//! authoritative seat counter), seat reservations (soft-deleted holds), and
//! bookings with their ordered legs.
//!
//! All queries are runtime-checked `sqlx` statements over one shared
//! [`sqlx::PgPool`]. Every trait method is a single atomic statement except
//! the booking insert, which wraps the booking row and its legs in one
//! transaction. Multi-statement inventory sequences are composed by the
//! engine, not here.

mod bookings;
mod flights;
mod pool;
mod reservations;

pub use bookings::PgBookingStore;
pub use flights::PgFlightStore;
pub use pool::{connect, MIGRATOR};
pub use reservations::PgReservationStore;

use skybook_core::error::StoreError;

/// Maps any sqlx failure to the retryable storage error.
pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// Whether `err` is a unique violation on the named constraint or index.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some(constraint))
}
