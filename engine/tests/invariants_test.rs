//! Property-based checks of the overbooking invariant.
//!
//! For any sequence of reserve/confirm/release/sweep operations and any
//! clock movement, every flight must satisfy
//! `available + Σ(active holds) + Σ(confirmed) = capacity` at every step,
//! and `available` can never go negative (it is unsigned here, so the
//! conditional decrement is what this actually exercises).

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::Duration as ChronoDuration;
use proptest::prelude::*;
use skybook_core::config::BookingConfig;
use skybook_core::Clock;
use skybook_core::stores::ReservationStore;
use skybook_core::types::{BookingId, FlightId};
use skybook_engine::{InventoryEngine, ReserveOutcome};
use skybook_testing::{
    test_flight, InMemoryFlightMutex, InMemoryFlightStore, InMemoryReservationStore,
    InMemorySeatCache, ManualClock,
};
use std::collections::HashMap;
use std::sync::Arc;

const FLIGHTS: [(&str, u32); 3] = [("F1", 5), ("F2", 8), ("F3", 13)];
const BOOKING_POOL: usize = 6;
const RESERVE_TTL_SECS: i64 = 60;

#[derive(Clone, Debug)]
enum Op {
    Reserve {
        booking: usize,
        legs: Vec<usize>,
        seats: u32,
    },
    Confirm {
        booking: usize,
    },
    Release {
        booking: usize,
    },
    Advance {
        seconds: u32,
    },
    Sweep,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (
            0..BOOKING_POOL,
            proptest::collection::vec(0..FLIGHTS.len(), 1..=3),
            1..=4u32,
        )
            .prop_map(|(booking, legs, seats)| Op::Reserve {
                booking,
                legs,
                seats,
            }),
        2 => (0..BOOKING_POOL).prop_map(|booking| Op::Confirm { booking }),
        2 => (0..BOOKING_POOL).prop_map(|booking| Op::Release { booking }),
        1 => (1..180u32).prop_map(|seconds| Op::Advance { seconds }),
        1 => Just(Op::Sweep),
    ]
}

struct World {
    flights: Arc<InMemoryFlightStore>,
    reservations: Arc<InMemoryReservationStore>,
    clock: Arc<ManualClock>,
    engine: InventoryEngine,
    /// Legs and seat count of each booking's live hold, recorded at
    /// reserve-success time so confirm knows what it committed.
    held: HashMap<usize, (Vec<FlightId>, u32)>,
    /// Seats permanently committed per flight by successful confirms.
    confirmed: HashMap<FlightId, u32>,
}

fn world() -> World {
    let flights = Arc::new(InMemoryFlightStore::new());
    for (id, capacity) in FLIGHTS {
        flights.put(test_flight(id, capacity));
    }
    let reservations = Arc::new(InMemoryReservationStore::new());
    let clock = Arc::new(ManualClock::start_now());
    let engine = InventoryEngine::new(
        flights.clone(),
        reservations.clone(),
        Arc::new(InMemorySeatCache::new()),
        Arc::new(InMemoryFlightMutex::new()),
        clock.clone(),
        &BookingConfig {
            reserve_ttl_minutes: 1,
            sweep_interval_seconds: 10,
            lock_ttl_seconds: 10,
            lock_wait_seconds: 1,
            lock_retry_delay_ms: 2,
            max_seats_per_booking: 9,
            min_seats_per_booking: 1,
            booking_reconcile_interval_seconds: 30,
        },
    );
    World {
        flights,
        reservations,
        clock,
        engine,
        held: HashMap::new(),
        confirmed: HashMap::new(),
    }
}

fn booking_id(slot: usize) -> BookingId {
    BookingId::new(format!("BK_prop_{slot}"))
}

async fn apply(world: &mut World, op: Op) {
    match op {
        Op::Reserve {
            booking,
            legs,
            seats,
        } => {
            let leg_ids: Vec<FlightId> = legs
                .iter()
                .map(|&i| FlightId::new(FLIGHTS[i].0))
                .collect();
            let outcome = world
                .engine
                .reserve(
                    &booking_id(booking),
                    &leg_ids,
                    seats,
                    ChronoDuration::seconds(RESERVE_TTL_SECS),
                )
                .await;
            if matches!(outcome, ReserveOutcome::Success { .. }) {
                let mut unique = leg_ids;
                unique.sort();
                unique.dedup();
                world.held.insert(booking, (unique, seats));
            }
        }
        Op::Confirm { booking } => {
            if world.engine.confirm(&booking_id(booking)).await {
                let (legs, seats) = world
                    .held
                    .remove(&booking)
                    .unwrap_or_else(|| panic!("confirmed a hold the model never saw"));
                for leg in legs {
                    *world.confirmed.entry(leg).or_insert(0) += seats;
                }
            }
        }
        Op::Release { booking } => {
            if world.engine.release(&booking_id(booking)).await {
                world.held.remove(&booking);
            }
        }
        Op::Advance { seconds } => {
            world.clock.advance(ChronoDuration::seconds(i64::from(seconds)));
        }
        Op::Sweep => {
            world.engine.sweep_expired(world.clock.now()).await;
            // Anything the sweeper reclaimed no longer holds seats.
            let mut still_active: Vec<usize> = Vec::new();
            for slot in world.held.keys() {
                if world
                    .reservations
                    .find_active_by_booking(&booking_id(*slot))
                    .await
                    .unwrap()
                    .is_empty()
                {
                    continue;
                }
                still_active.push(*slot);
            }
            world.held.retain(|slot, _| still_active.contains(slot));
        }
    }
}

fn assert_invariant(world: &World) {
    let mut active_per_flight: HashMap<FlightId, u32> = HashMap::new();
    for row in world.reservations.all_rows() {
        if row.deleted_at.is_none() {
            *active_per_flight.entry(row.flight_id).or_insert(0) += row.seats;
        }
    }

    for (id, capacity) in FLIGHTS {
        let flight_id = FlightId::new(id);
        let available = world
            .flights
            .available(&flight_id)
            .unwrap_or_else(|| panic!("flight {id} vanished"));
        let active = active_per_flight.get(&flight_id).copied().unwrap_or(0);
        let confirmed = world.confirmed.get(&flight_id).copied().unwrap_or(0);
        assert_eq!(
            available + active + confirmed,
            capacity,
            "flight {id}: available={available} active={active} confirmed={confirmed} capacity={capacity}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_overbooking_under_any_op_sequence(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let mut world = world();
            assert_invariant(&world);
            for op in ops {
                apply(&mut world, op).await;
                assert_invariant(&world);
            }
        });
    }

    #[test]
    fn repeated_reserve_is_idempotent(seats in 1..=4u32, legs in proptest::collection::vec(0..FLIGHTS.len(), 1..=3)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let world = world();
            let leg_ids: Vec<FlightId> = legs.iter().map(|&i| FlightId::new(FLIGHTS[i].0)).collect();
            let booking = BookingId::new("BK_idem");

            let first = world
                .engine
                .reserve(&booking, &leg_ids, seats, ChronoDuration::seconds(RESERVE_TTL_SECS))
                .await;
            let rows_after_first = world.reservations.all_rows();
            let second = world
                .engine
                .reserve(&booking, &leg_ids, seats, ChronoDuration::seconds(RESERVE_TTL_SECS))
                .await;

            match first {
                ReserveOutcome::Success { expires_at } => {
                    prop_assert_eq!(second, ReserveOutcome::AlreadyReserved { expires_at });
                    prop_assert_eq!(world.reservations.all_rows(), rows_after_first);
                }
                ReserveOutcome::NoSeats { flight_id } => {
                    // A failed reserve left nothing behind, so the replay
                    // fails identically.
                    prop_assert_eq!(second, ReserveOutcome::NoSeats { flight_id });
                    prop_assert!(rows_after_first.is_empty());
                }
                other => prop_assert!(false, "unexpected first outcome {:?}", other),
            }
            assert_invariant(&world);
            Ok(())
        })?;
    }
}
