//! `PostgreSQL`-backed booking store.

use crate::{db_err, is_unique_violation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skybook_core::error::StoreError;
use skybook_core::stores::BookingStore;
use skybook_core::types::{
    Booking, BookingId, BookingLeg, BookingStatus, FlightId, FlightIdentifier, FlightType, Money,
    UserId,
};
use sqlx::PgPool;

const IDEMPOTENCY_UNIQUE_CONSTRAINT: &str = "bookings_idempotency_key_key";

type BookingRow = (
    String,          // booking_id
    String,          // user_id
    String,          // flight_type
    String,          // flight_identifier
    i32,             // no_of_seats
    i64,             // total_price_cents
    String,          // status
    Option<String>,  // idempotency_key
    Option<String>,  // payment_id
    DateTime<Utc>,   // created_at
    DateTime<Utc>,   // updated_at
);

const BOOKING_COLUMNS: &str = "booking_id, user_id, flight_type, flight_identifier, no_of_seats, \
     total_price_cents, status, idempotency_key, payment_id, created_at, updated_at";

#[allow(clippy::cast_sign_loss)] // Counts and prices are non-negative by schema CHECKs
fn booking_from_row(row: BookingRow) -> Result<Booking, StoreError> {
    let flight_type = FlightType::parse(&row.2)
        .ok_or_else(|| StoreError::Database(format!("unknown flight type '{}'", row.2)))?;
    let status = BookingStatus::parse(&row.6)
        .ok_or_else(|| StoreError::Database(format!("unknown booking status '{}'", row.6)))?;
    Ok(Booking {
        booking_id: BookingId::new(row.0),
        user_id: UserId::new(row.1),
        flight_type,
        flight_identifier: FlightIdentifier::new(row.3),
        no_of_seats: row.4 as u32,
        total_price: Money::from_cents(row.5 as u64),
        status,
        idempotency_key: row.7,
        payment_id: row.8,
        created_at: row.9,
        updated_at: row.10,
    })
}

/// `PostgreSQL` implementation of [`BookingStore`].
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Creates a store over a shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn legs_of(&self, booking_id: &BookingId) -> Result<Vec<BookingLeg>, StoreError> {
        let rows: Vec<(String, String, i32)> = sqlx::query_as(
            "SELECT booking_id, flight_id, leg_order
             FROM booking_flights
             WHERE booking_id = $1
             ORDER BY leg_order",
        )
        .bind(booking_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        #[allow(clippy::cast_sign_loss)] // leg_order >= 0 by schema CHECK
        let legs = rows
            .into_iter()
            .map(|(booking_id, flight_id, leg_order)| BookingLeg {
                booking_id: BookingId::new(booking_id),
                flight_id: FlightId::new(flight_id),
                leg_order: leg_order as u32,
            })
            .collect();
        Ok(legs)
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking, legs: &[BookingLeg]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let inserted = sqlx::query(
            "INSERT INTO bookings
                 (booking_id, user_id, flight_type, flight_identifier, no_of_seats,
                  total_price_cents, status, idempotency_key, payment_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(booking.booking_id.as_str())
        .bind(booking.user_id.as_str())
        .bind(booking.flight_type.as_str())
        .bind(booking.flight_identifier.as_str())
        .bind(i64::from(booking.no_of_seats))
        .bind(price_cents(booking.total_price))
        .bind(booking.status.as_str())
        .bind(booking.idempotency_key.as_deref())
        .bind(booking.payment_id.as_deref())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(if is_unique_violation(&e, IDEMPOTENCY_UNIQUE_CONSTRAINT) {
                StoreError::IdempotencyConflict
            } else {
                db_err(e)
            });
        }

        for leg in legs {
            sqlx::query(
                "INSERT INTO booking_flights (booking_id, flight_id, leg_order)
                 VALUES ($1, $2, $3)",
            )
            .bind(leg.booking_id.as_str())
            .bind(leg.flight_id.as_str())
            .bind(i64::from(leg.leg_order))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn find_by_id(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => {
                let booking = booking_from_row(row)?;
                let legs = self.legs_of(&booking.booking_id).await?;
                Ok(Some((booking, legs)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<(Booking, Vec<BookingLeg>)>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => {
                let booking = booking_from_row(row)?;
                let legs = self.legs_of(&booking.booking_id).await?;
                Ok(Some((booking, legs)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<(Booking, Vec<BookingLeg>)>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            let booking = booking_from_row(row)?;
            let legs = self.legs_of(&booking.booking_id).await?;
            found.push((booking, legs));
        }
        Ok(found)
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'PENDING' AND created_at < $1
             ORDER BY created_at"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn transition_status(
        &self,
        booking_id: &BookingId,
        expected: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE bookings
             SET status = $3, updated_at = NOW()
             WHERE booking_id = $1 AND status = $2",
        )
        .bind(booking_id.as_str())
        .bind(expected.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_payment_id(
        &self,
        booking_id: &BookingId,
        payment_id: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bookings
             SET payment_id = $2, updated_at = NOW()
             WHERE booking_id = $1",
        )
        .bind(booking_id.as_str())
        .bind(payment_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[allow(clippy::cast_possible_wrap)] // Prices fit comfortably in i64 cents
const fn price_cents(price: Money) -> i64 {
    price.cents() as i64
}
