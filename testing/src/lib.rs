//! # Skybook Testing
//!
//! In-memory implementations of every `skybook-core` seam, plus a manually
//! driven clock and recording external adapters.
//!
//! These are real implementations, not stubs: the in-memory flight store
//! performs a genuinely atomic conditional decrement, the in-memory mutex
//! really excludes concurrent holders, and the reservation store enforces
//! the active-row uniqueness rule. That lets the inventory engine and the
//! orchestrator be exercised end-to-end — including the concurrency
//! properties — without PostgreSQL or Redis.
//!
//! ## Example
//!
//! ```ignore
//! let flights = Arc::new(InMemoryFlightStore::new());
//! flights.put(test_flight("FL201", 100)).await;
//! let engine = InventoryEngine::new(/* … in-memory everything … */);
//! ```

mod adapters;
mod cache;
mod clock;
mod lock;
mod stores;

pub use adapters::{RecordedPaymentRequest, RecordingPayments, StaticSearchFacade};
pub use cache::InMemorySeatCache;
pub use clock::ManualClock;
pub use lock::InMemoryFlightMutex;
pub use stores::{
    test_flight, InMemoryBookingStore, InMemoryFlightStore, InMemoryReservationStore,
};
