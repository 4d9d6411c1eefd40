//! Distributed per-flight mutex seam.
//!
//! Advisory mutual exclusion keyed by flight id, with TTL auto-release and
//! fencing via unique owner tokens. The multi-key form acquires in
//! lexicographic key order — the single mechanism preventing cross-booking
//! deadlock when leg sets overlap.

use crate::error::LockError;
use crate::types::FlightId;
use async_trait::async_trait;
use std::time::Duration;

/// Proof of lock ownership.
///
/// Carries the owner token stored under each key so release can fence
/// against a TTL-expired lock that another holder has since taken: release
/// only deletes a key whose stored owner still matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockHandle {
    token: String,
    keys: Vec<FlightId>,
}

impl LockHandle {
    /// Builds a handle for `keys` owned by `token`.
    #[must_use]
    pub const fn new(token: String, keys: Vec<FlightId>) -> Self {
        Self { token, keys }
    }

    /// The unique owner token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The locked keys, in acquisition (lexicographic) order.
    #[must_use]
    pub fn keys(&self) -> &[FlightId] {
        &self.keys
    }
}

/// Distributed, keyed mutex.
///
/// `lock_ttl` is an upper bound on holder correctness: once it lapses a
/// second acquirer may enter, so callers must keep critical sections shorter
/// than the TTL and treat release-after-expiry as best-effort.
#[async_trait]
pub trait FlightMutex: Send + Sync {
    /// Attempts to take a single key, retrying with a small fixed delay until
    /// `wait_budget` is exhausted. `Ok(None)` means the budget ran out.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the lock backend itself fails.
    async fn acquire(
        &self,
        key: &FlightId,
        lock_ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<LockHandle>, LockError>;

    /// Takes several keys in lexicographic order (duplicates collapsed),
    /// each with the same per-key budget. On failure at position `k`, keys
    /// `0..k` are released before returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the lock backend itself fails.
    async fn acquire_many(
        &self,
        keys: &[FlightId],
        lock_ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<LockHandle>, LockError>;

    /// Releases every key in the handle whose stored owner still matches the
    /// handle's token. Best-effort after TTL expiry.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the lock backend itself fails.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

/// Returns `keys` sorted lexicographically with duplicates removed — the
/// global acquisition order shared by every implementation.
#[must_use]
pub fn acquisition_order(keys: &[FlightId]) -> Vec<FlightId> {
    let mut ordered: Vec<FlightId> = keys.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_order_sorts_and_dedups() {
        let keys = vec![
            FlightId::new("FL9"),
            FlightId::new("FL1"),
            FlightId::new("FL9"),
            FlightId::new("FL5"),
        ];
        let ordered = acquisition_order(&keys);
        assert_eq!(
            ordered,
            vec![FlightId::new("FL1"), FlightId::new("FL5"), FlightId::new("FL9")]
        );
    }
}
