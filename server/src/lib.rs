//! # Skybook Server
//!
//! The booking orchestrator, its HTTP surface, and the process composition
//! root.
//!
//! The orchestrator drives the three-phase CLAIM → PAY → CONFIRM lifecycle:
//! it resolves flight identifiers through the search facade, couples a
//! booking record to the inventory engine's reservation, fires the
//! asynchronous payment request, and reconciles the outcome the payment
//! processor later POSTs back. A background reconciler times out bookings
//! whose callback never arrives.
//!
//! The HTTP layer is a thin axum dispatch onto orchestrator and engine
//! methods; all construction happens explicitly in `main.rs` — no global
//! container.

pub mod api;
pub mod clients;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod server;

pub use error::ApiError;
pub use orchestrator::{BookingEntry, CreateBookingRequest, Orchestrator};
pub use server::{build_router, AppState};
