//! # Skybook Core
//!
//! Domain types and trait seams for the Skybook flight booking core.
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//!
//! - **Types**: flights, seat reservations, bookings and their identifiers
//!   ([`types`]).
//! - **Seams**: the store, cache, lock, and external-adapter traits that the
//!   inventory engine and orchestrator are written against ([`stores`],
//!   [`cache`], [`lock`], [`adapters`]). Production implementations live in
//!   `skybook-store` (PostgreSQL) and `skybook-cache` (Redis); in-memory
//!   implementations live in `skybook-testing`.
//! - **Errors**: one `thiserror` enum per seam plus the user-facing
//!   [`error::BookingError`] taxonomy with stable codes and retryability.
//! - **Configuration**: environment-driven [`config::Config`].
//! - **Clock**: the [`clock::Clock`] trait so TTL logic is testable with a
//!   deterministic time source.
//!
//! No I/O happens in this crate.

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod stores;
pub mod types;

pub use adapters::{Payments, ResolvedRoute, SearchFacade};
pub use cache::SeatCache;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{AdapterError, BookingError, CacheError, LockError, StoreError};
pub use lock::{FlightMutex, LockHandle};
pub use stores::{BookingStore, FlightStore, ReservationStore};
pub use types::{
    Booking, BookingId, BookingLeg, BookingStatus, Flight, FlightId, FlightIdentifier,
    FlightStatus, FlightType, Money, PaymentCallback, PaymentOutcome, SeatReservation, UserId,
};
