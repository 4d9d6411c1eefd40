//! In-memory seat cache.

use async_trait::async_trait;
use skybook_core::error::CacheError;
use skybook_core::types::FlightId;
use skybook_core::SeatCache;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-memory [`SeatCache`] over a hash map.
#[derive(Debug, Default)]
pub struct InMemorySeatCache {
    seats: Mutex<HashMap<FlightId, u32>>,
}

impl InMemorySeatCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<FlightId, u32>> {
        self.seats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SeatCache for InMemorySeatCache {
    async fn get(&self, flight_id: &FlightId) -> Result<Option<u32>, CacheError> {
        Ok(self.locked().get(flight_id).copied())
    }

    async fn set(&self, flight_id: &FlightId, seats: u32) -> Result<(), CacheError> {
        self.locked().insert(flight_id.clone(), seats);
        Ok(())
    }

    async fn delete(&self, flight_id: &FlightId) -> Result<(), CacheError> {
        self.locked().remove(flight_id);
        Ok(())
    }

    async fn increment(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError> {
        let mut seats = self.locked();
        let entry = seats.entry(flight_id.clone()).or_insert(0);
        *entry = entry.saturating_add(by);
        Ok(())
    }

    async fn decrement(&self, flight_id: &FlightId, by: u32) -> Result<(), CacheError> {
        let mut seats = self.locked();
        let entry = seats.entry(flight_id.clone()).or_insert(0);
        *entry = entry.saturating_sub(by);
        Ok(())
    }

    async fn min_across(&self, flight_ids: &[FlightId]) -> Result<u32, CacheError> {
        let seats = self.locked();
        let mut min = u32::MAX;
        for id in flight_ids {
            match seats.get(id) {
                Some(count) => min = min.min(*count),
                None => return Ok(0),
            }
        }
        if flight_ids.is_empty() {
            return Ok(0);
        }
        Ok(min)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn min_across_is_zero_when_any_key_is_missing() {
        let cache = InMemorySeatCache::new();
        let a = FlightId::new("A");
        let b = FlightId::new("B");
        cache.set(&a, 7).await.unwrap();

        assert_eq!(cache.min_across(&[a.clone(), b.clone()]).await.unwrap(), 0);

        cache.set(&b, 3).await.unwrap();
        assert_eq!(cache.min_across(&[a, b]).await.unwrap(), 3);
    }
}
