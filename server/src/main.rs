//! Skybook booking server.
//!
//! Composition root: loads configuration, connects `PostgreSQL` and Redis,
//! wires stores → engine → orchestrator, starts the background sweep and
//! reconcile jobs, and serves the HTTP API until SIGINT/SIGTERM.

use skybook_cache::{RedisFlightMutex, RedisSeatCache};
use skybook_core::clock::{Clock, SystemClock};
use skybook_core::stores::{BookingStore, FlightStore, ReservationStore};
use skybook_core::{Config, SeatCache};
use skybook_engine::{InventoryEngine, Scheduler};
use skybook_server::clients::{HttpPaymentsClient, HttpSearchClient};
use skybook_server::{build_router, metrics, AppState, Orchestrator};
use skybook_store::{PgBookingStore, PgFlightStore, PgReservationStore};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skybook=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skybook booking server");

    let config = Config::from_env();
    info!(
        database_url = %config.database.url,
        redis_url = %config.redis.url,
        "Configuration loaded"
    );

    // Storage.
    info!("Connecting to database...");
    let pool = skybook_store::connect(&config.database).await?;
    let flights: Arc<dyn FlightStore> = Arc::new(PgFlightStore::new(pool.clone()));
    let reservations: Arc<dyn ReservationStore> = Arc::new(PgReservationStore::new(pool.clone()));
    let bookings: Arc<dyn BookingStore> = Arc::new(PgBookingStore::new(pool));
    info!("Database connected, migrations applied");

    // Cache and locks.
    info!("Connecting to Redis...");
    let redis = skybook_cache::connect(&config.redis).await?;
    let cache: Arc<dyn SeatCache> = Arc::new(RedisSeatCache::new(redis.clone()));
    let mutex = Arc::new(RedisFlightMutex::new(
        redis,
        config.booking.lock_retry_delay(),
    ));
    info!("Redis connected");

    // Engine and orchestrator.
    let clock = Arc::new(SystemClock);
    let engine = Arc::new(InventoryEngine::new(
        flights.clone(),
        reservations,
        cache.clone(),
        mutex,
        clock.clone(),
        &config.booking,
    ));

    let search = Arc::new(HttpSearchClient::new(&config.external.search_base_url)?);
    let payments = Arc::new(HttpPaymentsClient::new(&config.external.payments_base_url)?);
    let orchestrator = Arc::new(Orchestrator::new(
        bookings,
        engine.clone(),
        search,
        payments,
        clock.clone(),
        config.booking.clone(),
        &config.external.callback_base_url,
    ));

    // Background jobs: the inventory sweep and the booking reconciler run on
    // independent cadences, each serial on its own worker.
    let mut scheduler = Scheduler::new();
    {
        let engine = engine.clone();
        let clock = clock.clone();
        scheduler.every(
            "inventory-sweep",
            config.booking.sweep_interval(),
            move || {
                let engine = engine.clone();
                let clock = clock.clone();
                async move {
                    let report = engine.sweep_expired(clock.now()).await;
                    metrics::sweep_released(report.released_bookings);
                }
            },
        );
    }
    {
        let orchestrator = orchestrator.clone();
        scheduler.every(
            "booking-reconcile",
            config.booking.reconcile_interval(),
            move || {
                let orchestrator = orchestrator.clone();
                async move {
                    orchestrator.reconcile_pending().await;
                }
            },
        );
    }
    info!(jobs = scheduler.job_count(), "background jobs started");

    // HTTP surface.
    let state = AppState::new(orchestrator, engine, flights, cache);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
