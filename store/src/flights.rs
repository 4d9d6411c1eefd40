//! `PostgreSQL`-backed flight store.

use crate::db_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::error::StoreError;
use skybook_core::stores::FlightStore;
use skybook_core::types::{Flight, FlightId, FlightStatus, Money};
use sqlx::PgPool;

type FlightRow = (
    String,             // flight_id
    String,             // source
    String,             // destination
    DateTime<Utc>,      // departure_time
    DateTime<Utc>,      // arrival_time
    i32,                // total_seats
    i32,                // available_seats
    i64,                // price_cents
    String,             // status
    DateTime<Utc>,      // created_at
    DateTime<Utc>,      // updated_at
);

const FLIGHT_COLUMNS: &str = "flight_id, source, destination, departure_time, arrival_time, \
     total_seats, available_seats, price_cents, status, created_at, updated_at";

#[allow(clippy::cast_sign_loss)] // Counters and prices are non-negative by schema CHECKs
fn flight_from_row(row: FlightRow) -> Result<Flight, StoreError> {
    let status = FlightStatus::parse(&row.8)
        .ok_or_else(|| StoreError::Database(format!("unknown flight status '{}'", row.8)))?;
    Ok(Flight {
        flight_id: FlightId::new(row.0),
        source: row.1,
        destination: row.2,
        departure_time: row.3,
        arrival_time: row.4,
        total_seats: row.5 as u32,
        available_seats: row.6 as u32,
        price: Money::from_cents(row.7 as u64),
        status,
        created_at: row.9,
        updated_at: row.10,
    })
}

/// `PostgreSQL` implementation of [`FlightStore`].
#[derive(Clone)]
pub struct PgFlightStore {
    pool: PgPool,
}

impl PgFlightStore {
    /// Creates a store over a shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlightStore for PgFlightStore {
    async fn get(&self, flight_id: &FlightId) -> Result<Option<Flight>, StoreError> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_id = $1"
        ))
        .bind(flight_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(flight_from_row).transpose()
    }

    async fn conditional_decrement(
        &self,
        flight_id: &FlightId,
        seats: u32,
    ) -> Result<bool, StoreError> {
        let seats = i64::from(seats);
        let result = sqlx::query(
            "UPDATE flights
             SET available_seats = available_seats - $2, updated_at = NOW()
             WHERE flight_id = $1 AND available_seats >= $2",
        )
        .bind(flight_id.as_str())
        .bind(seats)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment(&self, flight_id: &FlightId, seats: u32) -> Result<(), StoreError> {
        let seats = i64::from(seats);
        sqlx::query(
            "UPDATE flights
             SET available_seats = LEAST(available_seats + $2, total_seats),
                 updated_at = NOW()
             WHERE flight_id = $1",
        )
        .bind(flight_id.as_str())
        .bind(seats)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Flight>, StoreError> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE status = 'ACTIVE' ORDER BY flight_id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(flight_from_row).collect()
    }
}
