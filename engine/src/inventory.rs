//! The reservation state machine.
//!
//! All seat mutations flow through [`InventoryEngine`]. The overbooking
//! invariant it maintains: for every flight,
//! `available_seats + Σ(active holds) + Σ(confirmed seats) = total_seats`,
//! with `available_seats` never negative. Decrements happen at reserve time;
//! confirm only soft-deletes the hold, so the seats stay committed without a
//! second counter touch.
//!
//! Multi-statement sequences run under the per-flight mutex; a failed leg is
//! compensated by re-incrementing the legs already taken, so no partial
//! reservation is ever observable. The crash windows that compensation
//! cannot cover (process death between statements) are bounded by the
//! reservation TTL and reclaimed by [`InventoryEngine::sweep_expired`].

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use skybook_core::clock::Clock;
use skybook_core::config::BookingConfig;
use skybook_core::lock::{FlightMutex, LockHandle};
use skybook_core::stores::{FlightStore, ReservationStore};
use skybook_core::types::{BookingId, FlightId, SeatReservation};
use skybook_core::SeatCache;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a reserve call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Seats are held on every leg until `expires_at`.
    Success {
        /// When the hold lapses without confirmation.
        expires_at: DateTime<Utc>,
    },
    /// The booking already holds an active reservation; the earlier call's
    /// expiry is returned and nothing was re-reserved.
    AlreadyReserved {
        /// Expiry of the existing hold (earliest leg).
        expires_at: DateTime<Utc>,
    },
    /// A leg had fewer seats than requested; every earlier decrement was
    /// rolled back. Not retryable for the caller.
    NoSeats {
        /// The first leg that could not be decremented.
        flight_id: FlightId,
    },
    /// The flight locks could not be won within the wait budget. Retryable.
    LockFailed,
    /// Storage failed mid-flight; any partial state was compensated.
    /// Retryable.
    Internal,
}

/// Summary of one expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired reservation rows found.
    pub expired_rows: usize,
    /// Bookings whose holds were released this pass.
    pub released_bookings: usize,
    /// Bookings skipped (released concurrently, or a per-booking failure
    /// that the next tick will retry).
    pub skipped_bookings: usize,
}

/// The inventory reservation engine (sole writer of seat state).
pub struct InventoryEngine {
    flights: Arc<dyn FlightStore>,
    reservations: Arc<dyn ReservationStore>,
    cache: Arc<dyn SeatCache>,
    mutex: Arc<dyn FlightMutex>,
    clock: Arc<dyn Clock>,
    lock_ttl: Duration,
    lock_wait: Duration,
}

impl InventoryEngine {
    /// Wires the engine to its stores, cache, mutex, and clock.
    #[must_use]
    pub fn new(
        flights: Arc<dyn FlightStore>,
        reservations: Arc<dyn ReservationStore>,
        cache: Arc<dyn SeatCache>,
        mutex: Arc<dyn FlightMutex>,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            flights,
            reservations,
            cache,
            mutex,
            clock,
            lock_ttl: config.lock_ttl(),
            lock_wait: config.lock_wait(),
        }
    }

    // ========================================================================
    // reserve
    // ========================================================================

    /// Atomically holds `seats` seats on every flight in `flight_ids` for
    /// `ttl`, all-or-nothing.
    ///
    /// Repeating the call for a booking that already holds an active
    /// reservation is a no-op returning the prior expiry.
    pub async fn reserve(
        &self,
        booking_id: &BookingId,
        flight_ids: &[FlightId],
        seats: u32,
        ttl: ChronoDuration,
    ) -> ReserveOutcome {
        if flight_ids.is_empty() || seats == 0 {
            warn!(booking_id = %booking_id, "reserve called with empty legs or zero seats");
            return ReserveOutcome::Internal;
        }

        // Idempotency: a repeated reserve reports the existing hold, dated
        // by its earliest-lapsing leg.
        match self.reservations.find_active_by_booking(booking_id).await {
            Ok(active) if !active.is_empty() => {
                let expires_at = active
                    .iter()
                    .map(|r| r.expires_at)
                    .min()
                    .unwrap_or_else(|| self.clock.now());
                debug!(booking_id = %booking_id, %expires_at, "reserve replay, hold already active");
                return ReserveOutcome::AlreadyReserved { expires_at };
            }
            Ok(_) => {}
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "reserve pre-check failed");
                return ReserveOutcome::Internal;
            }
        }

        // A computed route never legally repeats a leg; collapse duplicates
        // defensively so a bad input cannot self-deadlock or double-hold.
        let legs = dedup_preserving(flight_ids);

        let guard = match self
            .mutex
            .acquire_many(&legs, self.lock_ttl, self.lock_wait)
            .await
        {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!(booking_id = %booking_id, "reserve lost the lock wait budget");
                return ReserveOutcome::LockFailed;
            }
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "lock backend failed during reserve");
                return ReserveOutcome::Internal;
            }
        };

        let outcome = self.reserve_locked(booking_id, &legs, seats, ttl).await;
        self.release_locks(guard).await;
        outcome
    }

    /// Critical section of reserve: decrement every leg, insert the holds,
    /// write the cache through.
    async fn reserve_locked(
        &self,
        booking_id: &BookingId,
        legs: &[FlightId],
        seats: u32,
        ttl: ChronoDuration,
    ) -> ReserveOutcome {
        let now = self.clock.now();
        let expires_at = now + ttl;

        let mut decremented: Vec<FlightId> = Vec::with_capacity(legs.len());
        for flight_id in legs {
            match self.flights.conditional_decrement(flight_id, seats).await {
                Ok(true) => decremented.push(flight_id.clone()),
                Ok(false) => {
                    self.compensate_decrements(&decremented, seats).await;
                    info!(
                        booking_id = %booking_id,
                        flight_id = %flight_id,
                        seats,
                        "reserve rejected, insufficient seats"
                    );
                    return ReserveOutcome::NoSeats {
                        flight_id: flight_id.clone(),
                    };
                }
                Err(e) => {
                    warn!(booking_id = %booking_id, flight_id = %flight_id, error = %e, "decrement failed");
                    self.compensate_decrements(&decremented, seats).await;
                    return ReserveOutcome::Internal;
                }
            }
        }

        for flight_id in legs {
            let row = SeatReservation::new(
                booking_id.clone(),
                flight_id.clone(),
                seats,
                expires_at,
                now,
            );
            if let Err(e) = self.reservations.insert(&row).await {
                warn!(booking_id = %booking_id, flight_id = %flight_id, error = %e, "reservation insert failed");
                if let Err(undo) = self
                    .reservations
                    .soft_delete_by_booking(booking_id, now)
                    .await
                {
                    warn!(booking_id = %booking_id, error = %undo, "could not undo partial holds; sweeper will reclaim");
                }
                self.compensate_decrements(&decremented, seats).await;
                return ReserveOutcome::Internal;
            }
        }

        self.write_cache_through(legs).await;
        info!(
            booking_id = %booking_id,
            legs = legs.len(),
            seats,
            %expires_at,
            "seats reserved"
        );
        ReserveOutcome::Success { expires_at }
    }

    // ========================================================================
    // confirm
    // ========================================================================

    /// Commits a booking's hold after successful payment: the rows are
    /// soft-deleted and the seats stay decremented.
    ///
    /// Returns `false` when the hold has expired, was already released, or
    /// never existed — the caller fails the booking and the user retries.
    pub async fn confirm(&self, booking_id: &BookingId) -> bool {
        let active = match self.reservations.find_active_by_booking(booking_id).await {
            Ok(active) => active,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "confirm pre-check failed");
                return false;
            }
        };
        if active.is_empty() {
            debug!(booking_id = %booking_id, "confirm found no active hold");
            return false;
        }

        let now = self.clock.now();
        if active.iter().any(|r| r.is_expired(now)) {
            info!(booking_id = %booking_id, "confirm rejected, hold expired");
            return false;
        }

        let keys: Vec<FlightId> = active.iter().map(|r| r.flight_id.clone()).collect();
        let Some(guard) = self.try_lock(&keys, booking_id, "confirm").await else {
            return false;
        };

        // The claim below is the commit point: whoever soft-deletes the rows
        // decides their fate, and for confirm the seats are simply kept.
        let confirmed = match self
            .reservations
            .soft_delete_by_booking(booking_id, now)
            .await
        {
            Ok(claimed) => claimed > 0,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "confirm soft-delete failed");
                false
            }
        };

        self.release_locks(guard).await;
        if confirmed {
            info!(booking_id = %booking_id, "reservation confirmed");
        }
        confirmed
    }

    // ========================================================================
    // release
    // ========================================================================

    /// Returns a booking's held seats to availability and soft-deletes the
    /// hold. Idempotent: `false` means there was nothing (left) to release.
    pub async fn release(&self, booking_id: &BookingId) -> bool {
        let active = match self.reservations.find_active_by_booking(booking_id).await {
            Ok(active) => active,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "release pre-check failed");
                return false;
            }
        };
        if active.is_empty() {
            return false;
        }

        let keys: Vec<FlightId> = active.iter().map(|r| r.flight_id.clone()).collect();
        let Some(guard) = self.try_lock(&keys, booking_id, "release").await else {
            return false;
        };

        let released = self.release_locked(booking_id).await;
        self.release_locks(guard).await;
        released
    }

    /// Critical section of release: re-read, claim, return seats, refresh
    /// cache. Re-reading under the lock keeps the claim and the increments
    /// consistent with whatever won any race before us.
    async fn release_locked(&self, booking_id: &BookingId) -> bool {
        let active = match self.reservations.find_active_by_booking(booking_id).await {
            Ok(active) => active,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "release re-read failed");
                return false;
            }
        };
        if active.is_empty() {
            // Confirmed or released while we were waiting on the locks.
            return false;
        }

        let now = self.clock.now();
        match self
            .reservations
            .soft_delete_by_booking(booking_id, now)
            .await
        {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "release soft-delete failed");
                return false;
            }
        }

        let mut touched: Vec<FlightId> = Vec::with_capacity(active.len());
        for reservation in &active {
            if let Err(e) = self
                .flights
                .increment(&reservation.flight_id, reservation.seats)
                .await
            {
                // The hold is already claimed; the counter repair will land
                // on the next successful increment or operator intervention.
                warn!(
                    booking_id = %booking_id,
                    flight_id = %reservation.flight_id,
                    error = %e,
                    "seat return failed after claim"
                );
            }
            touched.push(reservation.flight_id.clone());
        }

        self.write_cache_through(&touched).await;
        info!(booking_id = %booking_id, legs = touched.len(), "reservation released");
        true
    }

    // ========================================================================
    // sweep
    // ========================================================================

    /// Releases every reservation that has expired by `now`, grouped by
    /// booking so each booking's legs are handled under one lock
    /// acquisition. Bookings are independent: one failure does not stop the
    /// batch, and anything unfinished is picked up on the next tick.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> SweepReport {
        let expired = match self.reservations.find_expired(now).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "expiry scan failed");
                return SweepReport::default();
            }
        };
        if expired.is_empty() {
            return SweepReport::default();
        }

        let mut by_booking: BTreeMap<BookingId, usize> = BTreeMap::new();
        for row in &expired {
            *by_booking.entry(row.booking_id.clone()).or_insert(0) += 1;
        }

        let mut report = SweepReport {
            expired_rows: expired.len(),
            ..SweepReport::default()
        };
        for booking_id in by_booking.keys() {
            if self.release(booking_id).await {
                report.released_bookings += 1;
            } else {
                report.skipped_bookings += 1;
            }
        }

        info!(
            expired_rows = report.expired_rows,
            released = report.released_bookings,
            skipped = report.skipped_bookings,
            "expiry sweep complete"
        );
        report
    }

    /// Whether the booking still holds an active (not soft-deleted) hold.
    ///
    /// Errs on the side of `true` when storage fails: the reconciler must
    /// never time a booking out on uncertain evidence.
    pub async fn has_active_hold(&self, booking_id: &BookingId) -> bool {
        match self.reservations.exists_active(booking_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "active-hold check failed");
                true
            }
        }
    }

    // ========================================================================
    // helpers
    // ========================================================================

    async fn try_lock(
        &self,
        keys: &[FlightId],
        booking_id: &BookingId,
        op: &'static str,
    ) -> Option<LockHandle> {
        match self
            .mutex
            .acquire_many(keys, self.lock_ttl, self.lock_wait)
            .await
        {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => {
                debug!(booking_id = %booking_id, op, "lock wait budget exhausted");
                None
            }
            Err(e) => {
                warn!(booking_id = %booking_id, op, error = %e, "lock backend failed");
                None
            }
        }
    }

    async fn release_locks(&self, guard: LockHandle) {
        if let Err(e) = self.mutex.release(guard).await {
            // TTL auto-release covers us; the lock just stays taken a bit
            // longer than necessary.
            warn!(error = %e, "lock release failed");
        }
    }

    /// Undoes decrements already applied in a failed reserve attempt.
    async fn compensate_decrements(&self, flights: &[FlightId], seats: u32) {
        for flight_id in flights {
            if let Err(e) = self.flights.increment(flight_id, seats).await {
                warn!(flight_id = %flight_id, error = %e, "rollback increment failed");
            }
        }
    }

    /// Refreshes the cache from the store of record. Failures are logged
    /// only: the cache repairs itself on the next write or a read-through.
    async fn write_cache_through(&self, flights: &[FlightId]) {
        for flight_id in flights {
            match self.flights.get(flight_id).await {
                Ok(Some(flight)) => {
                    if let Err(e) = self.cache.set(flight_id, flight.available_seats).await {
                        debug!(flight_id = %flight_id, error = %e, "cache write-through failed");
                    }
                }
                Ok(None) => {
                    if let Err(e) = self.cache.delete(flight_id).await {
                        debug!(flight_id = %flight_id, error = %e, "cache invalidation failed");
                    }
                }
                Err(e) => {
                    debug!(flight_id = %flight_id, error = %e, "cache refresh read failed");
                }
            }
        }
    }
}

fn dedup_preserving(flight_ids: &[FlightId]) -> Vec<FlightId> {
    let mut seen: Vec<FlightId> = Vec::with_capacity(flight_ids.len());
    for id in flight_ids {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use skybook_testing::{
        test_flight, InMemoryFlightMutex, InMemoryFlightStore, InMemoryReservationStore,
        InMemorySeatCache, ManualClock,
    };

    struct Fixture {
        flights: Arc<InMemoryFlightStore>,
        reservations: Arc<InMemoryReservationStore>,
        cache: Arc<InMemorySeatCache>,
        mutex: Arc<InMemoryFlightMutex>,
        clock: Arc<ManualClock>,
        engine: InventoryEngine,
    }

    fn fixture() -> Fixture {
        fixture_with(|config| config)
    }

    fn fixture_with(tune: impl FnOnce(BookingConfig) -> BookingConfig) -> Fixture {
        let flights = Arc::new(InMemoryFlightStore::new());
        let reservations = Arc::new(InMemoryReservationStore::new());
        let cache = Arc::new(InMemorySeatCache::new());
        let mutex = Arc::new(InMemoryFlightMutex::new());
        let clock = Arc::new(ManualClock::start_now());
        let config = tune(BookingConfig {
            reserve_ttl_minutes: 5,
            sweep_interval_seconds: 10,
            lock_ttl_seconds: 10,
            lock_wait_seconds: 1,
            lock_retry_delay_ms: 5,
            max_seats_per_booking: 9,
            min_seats_per_booking: 1,
            booking_reconcile_interval_seconds: 30,
        });
        let engine = InventoryEngine::new(
            flights.clone(),
            reservations.clone(),
            cache.clone(),
            mutex.clone(),
            clock.clone(),
            &config,
        );
        Fixture {
            flights,
            reservations,
            cache,
            mutex,
            clock,
            engine,
        }
    }

    fn ids(raw: &[&str]) -> Vec<FlightId> {
        raw.iter().map(|id| FlightId::new(*id)).collect()
    }

    #[tokio::test]
    async fn reserve_decrements_and_writes_cache_through() {
        let fx = fixture();
        fx.flights.put(test_flight("FL201", 100));
        let booking = BookingId::new("BK_1");

        let outcome = fx
            .engine
            .reserve(&booking, &ids(&["FL201"]), 2, ChronoDuration::minutes(5))
            .await;
        assert!(matches!(outcome, ReserveOutcome::Success { .. }));
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(98));
        assert_eq!(fx.reservations.active_count(), 1);
        assert_eq!(
            fx.cache.get(&FlightId::new("FL201")).await.unwrap(),
            Some(98)
        );
    }

    #[tokio::test]
    async fn repeated_reserve_is_a_no_op_with_the_prior_expiry() {
        let fx = fixture();
        fx.flights.put(test_flight("FL201", 100));
        let booking = BookingId::new("BK_1");
        let legs = ids(&["FL201"]);

        let first = fx
            .engine
            .reserve(&booking, &legs, 2, ChronoDuration::minutes(5))
            .await;
        let ReserveOutcome::Success { expires_at } = first else {
            panic!("first reserve must succeed, got {first:?}");
        };

        let second = fx
            .engine
            .reserve(&booking, &legs, 2, ChronoDuration::minutes(5))
            .await;
        assert_eq!(second, ReserveOutcome::AlreadyReserved { expires_at });
        assert_eq!(fx.reservations.active_count(), 1);
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(98));
    }

    #[tokio::test]
    async fn multi_leg_reserve_is_all_or_nothing() {
        let fx = fixture();
        fx.flights.put(test_flight("A", 5));
        fx.flights.put(test_flight("B", 1));
        fx.flights.put(test_flight("C", 5));
        let booking = BookingId::new("BK_1");

        let outcome = fx
            .engine
            .reserve(&booking, &ids(&["A", "B", "C"]), 2, ChronoDuration::minutes(5))
            .await;
        assert_eq!(
            outcome,
            ReserveOutcome::NoSeats {
                flight_id: FlightId::new("B")
            }
        );
        assert_eq!(fx.flights.available(&FlightId::new("A")), Some(5));
        assert_eq!(fx.flights.available(&FlightId::new("B")), Some(1));
        assert_eq!(fx.flights.available(&FlightId::new("C")), Some(5));
        assert_eq!(fx.reservations.active_count(), 0);
    }

    #[tokio::test]
    async fn confirm_keeps_seats_decremented() {
        let fx = fixture();
        fx.flights.put(test_flight("FL201", 100));
        let booking = BookingId::new("BK_1");

        fx.engine
            .reserve(&booking, &ids(&["FL201"]), 2, ChronoDuration::minutes(5))
            .await;
        assert!(fx.engine.confirm(&booking).await);

        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(98));
        assert_eq!(fx.reservations.active_count(), 0);

        // Confirm is not repeatable: the hold is gone.
        assert!(!fx.engine.confirm(&booking).await);
    }

    #[tokio::test]
    async fn confirm_rejects_an_expired_hold() {
        let fx = fixture();
        fx.flights.put(test_flight("FL201", 100));
        let booking = BookingId::new("BK_1");

        fx.engine
            .reserve(&booking, &ids(&["FL201"]), 2, ChronoDuration::minutes(1))
            .await;
        fx.clock.advance(ChronoDuration::seconds(61));

        assert!(!fx.engine.confirm(&booking).await);
        // The hold is still there for the sweeper; seats not yet returned.
        assert_eq!(fx.reservations.active_count(), 1);
    }

    #[tokio::test]
    async fn release_returns_seats_and_is_idempotent() {
        let fx = fixture();
        fx.flights.put(test_flight("FL201", 100));
        let booking = BookingId::new("BK_1");

        fx.engine
            .reserve(&booking, &ids(&["FL201"]), 3, ChronoDuration::minutes(5))
            .await;
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(97));

        assert!(fx.engine.release(&booking).await);
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(100));
        assert_eq!(
            fx.cache.get(&FlightId::new("FL201")).await.unwrap(),
            Some(100)
        );

        assert!(!fx.engine.release(&booking).await);
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(100));
    }

    #[tokio::test]
    async fn sweep_releases_only_expired_holds() {
        let fx = fixture();
        fx.flights.put(test_flight("FL1", 10));
        fx.flights.put(test_flight("FL2", 10));

        fx.engine
            .reserve(
                &BookingId::new("BK_old"),
                &ids(&["FL1"]),
                2,
                ChronoDuration::minutes(1),
            )
            .await;
        fx.clock.advance(ChronoDuration::seconds(90));
        fx.engine
            .reserve(
                &BookingId::new("BK_new"),
                &ids(&["FL2"]),
                2,
                ChronoDuration::minutes(5),
            )
            .await;

        let report = fx.engine.sweep_expired(fx.clock.now()).await;
        assert_eq!(report.expired_rows, 1);
        assert_eq!(report.released_bookings, 1);
        assert_eq!(report.skipped_bookings, 0);

        assert_eq!(fx.flights.available(&FlightId::new("FL1")), Some(10));
        assert_eq!(fx.flights.available(&FlightId::new("FL2")), Some(8));
        assert_eq!(fx.reservations.active_count(), 1);
    }

    #[tokio::test]
    async fn reserve_fails_fast_when_locks_are_held() {
        let fx = fixture_with(|mut config| {
            config.lock_wait_seconds = 0;
            config
        });
        fx.flights.put(test_flight("FL201", 100));

        // Park a foreign holder on the flight's lock.
        let held = fx
            .mutex
            .acquire(
                &FlightId::new("FL201"),
                Duration::from_secs(10),
                Duration::from_millis(20),
            )
            .await
            .unwrap()
            .unwrap();

        let outcome = fx
            .engine
            .reserve(
                &BookingId::new("BK_1"),
                &ids(&["FL201"]),
                2,
                ChronoDuration::minutes(5),
            )
            .await;
        assert_eq!(outcome, ReserveOutcome::LockFailed);
        assert_eq!(fx.flights.available(&FlightId::new("FL201")), Some(100));
        assert_eq!(fx.reservations.active_count(), 0);

        fx.mutex.release(held).await.unwrap();
    }
}
