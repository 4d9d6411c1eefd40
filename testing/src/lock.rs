//! In-memory flight mutex.
//!
//! A real mutual-exclusion implementation: holders are tracked in a table
//! with TTL deadlines, acquisition spins with a short sleep until the wait
//! budget lapses, and release fences on the owner token — the same contract
//! the Redis implementation provides, minus the network.

use async_trait::async_trait;
use skybook_core::error::LockError;
use skybook_core::lock::{acquisition_order, FlightMutex, LockHandle};
use skybook_core::types::FlightId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

struct Holder {
    token: String,
    expires_at: Instant,
}

/// In-memory [`FlightMutex`].
pub struct InMemoryFlightMutex {
    holders: Mutex<HashMap<FlightId, Holder>>,
    retry_delay: Duration,
}

impl Default for InMemoryFlightMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFlightMutex {
    /// Creates a mutex with a short (5 ms) retry delay suited to tests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            holders: Mutex::new(HashMap::new()),
            retry_delay: Duration::from_millis(5),
        }
    }

    /// Whether `key` is currently held (expired holders count as free).
    #[must_use]
    pub fn is_held(&self, key: &FlightId) -> bool {
        let holders = self.holders.lock().unwrap_or_else(PoisonError::into_inner);
        holders
            .get(key)
            .is_some_and(|h| h.expires_at > Instant::now())
    }

    /// Single compare-and-set attempt; expired holders are evicted first.
    fn try_take(&self, key: &FlightId, token: &str, lock_ttl: Duration) -> bool {
        let mut holders = self.holders.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match holders.get(key) {
            Some(holder) if holder.expires_at > now => false,
            _ => {
                holders.insert(
                    key.clone(),
                    Holder {
                        token: token.to_string(),
                        expires_at: now + lock_ttl,
                    },
                );
                true
            }
        }
    }

    fn release_if_owner(&self, key: &FlightId, token: &str) {
        let mut holders = self.holders.lock().unwrap_or_else(PoisonError::into_inner);
        if holders.get(key).is_some_and(|h| h.token == token) {
            holders.remove(key);
        }
    }

    async fn acquire_one(
        &self,
        key: &FlightId,
        token: &str,
        lock_ttl: Duration,
        wait_budget: Duration,
    ) -> bool {
        let deadline = Instant::now() + wait_budget;
        loop {
            if self.try_take(key, token, lock_ttl) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

#[async_trait]
impl FlightMutex for InMemoryFlightMutex {
    async fn acquire(
        &self,
        key: &FlightId,
        lock_ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        self.acquire_many(std::slice::from_ref(key), lock_ttl, wait_budget)
            .await
    }

    async fn acquire_many(
        &self,
        keys: &[FlightId],
        lock_ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        let ordered = acquisition_order(keys);
        let token = Uuid::new_v4().to_string();

        for (position, key) in ordered.iter().enumerate() {
            if !self.acquire_one(key, &token, lock_ttl, wait_budget).await {
                for acquired in &ordered[..position] {
                    self.release_if_owner(acquired, &token);
                }
                return Ok(None);
            }
        }
        Ok(Some(LockHandle::new(token, ordered)))
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        for key in handle.keys() {
            self.release_if_owner(key, handle.token());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquirer_waits_out_the_budget() {
        let mutex = InMemoryFlightMutex::new();
        let key = FlightId::new("FL1");
        let ttl = Duration::from_secs(10);

        let held = mutex
            .acquire(&key, ttl, Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        let contender = mutex
            .acquire(&key, ttl, Duration::from_millis(30))
            .await
            .unwrap();
        assert!(contender.is_none());

        mutex.release(held).await.unwrap();
        let retry = mutex
            .acquire(&key, ttl, Duration::from_millis(30))
            .await
            .unwrap();
        assert!(retry.is_some());
    }

    #[tokio::test]
    async fn failed_multi_acquire_releases_the_prefix() {
        let mutex = InMemoryFlightMutex::new();
        let a = FlightId::new("A");
        let b = FlightId::new("B");
        let ttl = Duration::from_secs(10);

        // Hold B so the pair acquisition fails at position 1.
        let holder = mutex
            .acquire(&b, ttl, Duration::from_millis(20))
            .await
            .unwrap()
            .unwrap();
        let pair = mutex
            .acquire_many(&[a.clone(), b.clone()], ttl, Duration::from_millis(30))
            .await
            .unwrap();
        assert!(pair.is_none());
        assert!(!mutex.is_held(&a), "prefix key A must have been rolled back");

        mutex.release(holder).await.unwrap();
    }

    #[tokio::test]
    async fn release_fences_on_the_owner_token() {
        let mutex = InMemoryFlightMutex::new();
        let key = FlightId::new("FL1");

        // First holder's TTL lapses, a second holder takes over.
        let stale = mutex
            .acquire(&key, Duration::from_millis(10), Duration::from_millis(20))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = mutex
            .acquire(&key, Duration::from_secs(5), Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();

        // The stale handle must not be able to free the new holder's lock.
        mutex.release(stale).await.unwrap();
        assert!(mutex.is_held(&key));

        mutex.release(fresh).await.unwrap();
        assert!(!mutex.is_held(&key));
    }
}
