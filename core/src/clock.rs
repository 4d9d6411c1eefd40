//! Time source abstraction.
//!
//! TTL arithmetic (reservation expiry, sweep cutoffs) always goes through
//! [`Clock`] so tests can drive time deterministically.

use chrono::{DateTime, Utc};

/// A wall-clock time source.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
