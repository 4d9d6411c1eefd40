//! # Skybook Cache
//!
//! Redis-backed implementations of the two coordination seams:
//!
//! - [`RedisSeatCache`] — the denormalized `flight:{id}:seats` availability
//!   projection the search read side filters on.
//! - [`RedisFlightMutex`] — the advisory `lock:flight:{id}` mutex with TTL
//!   auto-release and owner-token fencing.
//!
//! Both share a [`redis::aio::ConnectionManager`], created once at startup
//! via [`connect`].

mod mutex;
mod seat_cache;

pub use mutex::RedisFlightMutex;
pub use seat_cache::RedisSeatCache;

use redis::aio::ConnectionManager;
use skybook_core::config::RedisConfig;
use skybook_core::error::CacheError;
use std::time::Duration;

/// Opens a managed Redis connection per the configuration.
///
/// # Errors
///
/// Returns [`CacheError`] when the server is unreachable within the
/// configured timeout.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager, CacheError> {
    let client = redis::Client::open(config.url.as_str())
        .map_err(|e| CacheError(format!("invalid redis url: {e}")))?;

    let manager = tokio::time::timeout(
        Duration::from_secs(config.connect_timeout),
        ConnectionManager::new(client),
    )
    .await
    .map_err(|_| CacheError("redis connect timeout".to_string()))?
    .map_err(|e| CacheError(format!("redis connect failed: {e}")))?;

    Ok(manager)
}
