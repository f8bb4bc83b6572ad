//! Motofix Server
//!
//! Payment-callback ingestion and owner-notification service for the
//! repair-shop backend.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use motofix_core::events::realtime_channel;
use motofix_core::notify::{HttpPushGateway, InMemoryDedupCache, Notifier};
use motofix_core::processors::{
    CompletionSweeper, DailySweeper, InboxProcessor, LedgerReconciler,
};
use motofix_core::stores::{
    InboxStore, PgInboxStore, PgPaymentLedger, PgRepairOrderStore,
};
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Motofix - payment ingestion and notification service
#[derive(Parser, Debug)]
#[command(name = "motofix-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./motofix-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting motofix-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Stores and notification channels
    let inbox = PgInboxStore::new(db_pool.clone());
    let ledger = PgPaymentLedger::new(db_pool.clone());
    let orders = PgRepairOrderStore::new(db_pool.clone());
    let (realtime_tx, _) = realtime_channel();

    // Surface dead-lettered records to the operator at startup
    match inbox.count_dead().await {
        Ok(0) => {}
        Ok(count) => tracing::warn!(count, "dead-lettered inbox records present"),
        Err(e) => tracing::warn!(error = %e, "failed to count dead-lettered records"),
    }

    let push = HttpPushGateway::new(config.push.endpoint.clone(), config.push.api_key.clone());
    let notifier = Notifier::new(push, realtime_tx.clone());

    // Background processors, all cancelled through one shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconciler = Arc::new(LedgerReconciler::new(
        ledger,
        orders.clone(),
        notifier.clone(),
    ));
    let processor = InboxProcessor::new(
        inbox.clone(),
        reconciler,
        config.worker.to_processor_config(),
    );

    let sweeper = CompletionSweeper::new(
        orders,
        notifier,
        InMemoryDedupCache::new(),
        config.sweep.dedup_ttl(),
    );
    let daily = DailySweeper::new(
        sweeper.clone(),
        config.sweep.daily_hour,
        config.sweep.utc_offset(),
    );

    let workers = vec![
        tokio::spawn(processor.run(shutdown_rx.clone())),
        tokio::spawn(sweeper.run(config.sweep.interval(), shutdown_rx.clone())),
        tokio::spawn(daily.run(shutdown_rx)),
    ];

    // Create application state and run the server
    let state = AppState::new(db_pool.clone(), inbox, realtime_tx);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", config.server.listen);
    let result = run_server(router, config.server.listen).await;

    // Stop background workers; in-flight units finish before the loops exit
    tracing::info!("Stopping background processors...");
    let _ = shutdown_tx.send(true);
    for handle in workers {
        let _ = handle.await;
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
