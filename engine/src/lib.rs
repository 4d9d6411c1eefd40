//! # Skybook Engine
//!
//! The seat-inventory reservation engine and its background driver.
//!
//! [`InventoryEngine`] is the sole writer of seat counters and reservation
//! rows. It coordinates the flight store, reservation store, seat cache, and
//! per-flight mutex to implement the reservation state machine:
//!
//! ```text
//! NONE ──reserve──▶ ACTIVE ──confirm──▶ CONFIRMED (soft-deleted, seats kept)
//!                     │
//!                     └──release / sweep──▶ RELEASED (soft-deleted, seats returned)
//! ```
//!
//! [`Scheduler`] drives the expiry sweep (and the orchestrator's booking
//! reconciler) on fixed intervals, one serial worker per job.

pub mod inventory;
pub mod scheduler;

pub use inventory::{InventoryEngine, ReserveOutcome, SweepReport};
pub use scheduler::Scheduler;
