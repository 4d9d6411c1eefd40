//! Redis-backed seat-availability cache.
//!
//! Keys: `flight:{flight_id}:seats` → integer seat count. The engine writes
//! through after every committed counter mutation; nothing here is
//! authoritative.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use skybook_core::error::CacheError;
use skybook_core::types::FlightId;
use skybook_core::SeatCache;

fn seats_key(flight_id: &FlightId) -> String {
    format!("flight:{flight_id}:seats")
}

fn backend(err: redis::RedisError) -> CacheError {
    CacheError(err.to_string())
}

/// Redis implementation of [`SeatCache`].
#[derive(Clone)]
pub struct RedisSeatCache {
    conn: ConnectionManager,
}

impl RedisSeatCache {
    /// Creates a cache over a shared connection manager.
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SeatCache for RedisSeatCache {
    async fn get(&self, flight_id: &FlightId) -> Result<Option<u32>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(seats_key(flight_id)).await.map_err(backend)?;
        // A counter driven below zero by racing DECRBYs still reads as "no
        // seats" to consumers.
        Ok(value.map(|v| u32::try_from(v).unwrap_or(0)))
    }

    async fn set(&self, flight_id: &FlightId, seats: u32) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let () = conn
            .set(seats_key(flight_id), i64::from(seats))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, flight_id: &FlightId) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(seats_key(flight_id)).await.map_err(backend)?;
        Ok(())
    }

    async fn increment(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .incr(seats_key(flight_id), i64::from(by))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn decrement(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .decr(seats_key(flight_id), i64::from(by))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn min_across(&self, flight_ids: &[FlightId]) -> Result<u32, CacheError> {
        if flight_ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = flight_ids.iter().map(seats_key).collect();
        let mut conn = self.conn.clone();
        let values: Vec<Option<i64>> = conn.mget(keys).await.map_err(backend)?;

        let mut min = u32::MAX;
        for value in values {
            match value {
                Some(count) => min = min.min(u32::try_from(count).unwrap_or(0)),
                // Any uncached leg makes the route unanswerable; report it
                // as sold out and let the caller read through the store.
                None => return Ok(0),
            }
        }
        Ok(min)
    }
}
