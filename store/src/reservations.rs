//! `PostgreSQL`-backed seat reservation store.
//!
//! Rows are soft-deleted only; every active-set query filters
//! `deleted_at IS NULL`, and the partial unique index turns a duplicate
//! active hold into a typed error.

use crate::{db_err, is_unique_violation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::error::StoreError;
use skybook_core::stores::ReservationStore;
use skybook_core::types::{BookingId, FlightId, SeatReservation};
use sqlx::PgPool;
use uuid::Uuid;

const ACTIVE_UNIQUE_INDEX: &str = "seat_reservations_active_booking_flight_idx";

type ReservationRow = (
    Uuid,                   // id
    String,                 // booking_id
    String,                 // flight_id
    i32,                    // seats
    DateTime<Utc>,          // expires_at
    DateTime<Utc>,          // created_at
    Option<DateTime<Utc>>,  // deleted_at
);

#[allow(clippy::cast_sign_loss)] // seats > 0 by schema CHECK
fn reservation_from_row(row: ReservationRow) -> SeatReservation {
    SeatReservation {
        id: row.0,
        booking_id: BookingId::new(row.1),
        flight_id: FlightId::new(row.2),
        seats: row.3 as u32,
        expires_at: row.4,
        created_at: row.5,
        deleted_at: row.6,
    }
}

/// `PostgreSQL` implementation of [`ReservationStore`].
#[derive(Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    /// Creates a store over a shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn insert(&self, reservation: &SeatReservation) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO seat_reservations
                 (id, booking_id, flight_id, seats, expires_at, created_at, deleted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reservation.id)
        .bind(reservation.booking_id.as_str())
        .bind(reservation.flight_id.as_str())
        .bind(i64::from(reservation.seats))
        .bind(reservation.expires_at)
        .bind(reservation.created_at)
        .bind(reservation.deleted_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e, ACTIVE_UNIQUE_INDEX) => {
                Err(StoreError::DuplicateReservation(
                    reservation.booking_id.clone(),
                    reservation.flight_id.clone(),
                ))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn find_active_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<SeatReservation>, StoreError> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            "SELECT id, booking_id, flight_id, seats, expires_at, created_at, deleted_at
             FROM seat_reservations
             WHERE booking_id = $1 AND deleted_at IS NULL
             ORDER BY flight_id",
        )
        .bind(booking_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(reservation_from_row).collect())
    }

    async fn exists_active(&self, booking_id: &BookingId) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                 SELECT 1 FROM seat_reservations
                 WHERE booking_id = $1 AND deleted_at IS NULL
             )",
        )
        .bind(booking_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.0)
    }

    async fn soft_delete_by_booking(
        &self,
        booking_id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE seat_reservations
             SET deleted_at = $2
             WHERE booking_id = $1 AND deleted_at IS NULL",
        )
        .bind(booking_id.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<SeatReservation>, StoreError> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            "SELECT id, booking_id, flight_id, seats, expires_at, created_at, deleted_at
             FROM seat_reservations
             WHERE deleted_at IS NULL AND expires_at <= $1
             ORDER BY expires_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(reservation_from_row).collect())
    }
}
