//! Connection pool setup and embedded migrations.

use skybook_core::config::DatabaseConfig;
use skybook_core::error::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// The crate's embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Connects a pool per the configuration and applies pending migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] when the database is unreachable or a
/// migration fails.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect(&config.url)
        .await
        .map_err(super::db_err)?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}
