//! hookrelay server
//!
//! Receives scanner reports over HTTP, drops repeats, and relays each new
//! event to the webhook channels it qualifies for.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use hookrelay_core::config::ConfigStore;
use hookrelay_core::dedup::{DedupLedger, DedupStore, MemoryLedger, PgLedger};
use hookrelay_core::delivery::WebhookDelivery;
use hookrelay_core::events::{dispatch_queue, ledger_command_channel};
use hookrelay_core::formatter::DiscordEmbedFormatter;
use hookrelay_core::framework::DatabaseProcessor;
use hookrelay_core::processors::{
    DeliveryWorkerPool, IngestionGate, LedgerWriter, RetentionSweeper,
};
use hookrelay_core::stats::RelayStats;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// hookrelay - deduplicating webhook relay for scanner reports
#[derive(Parser, Debug)]
#[command(name = "hookrelay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./hookrelay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:5000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Keep dedup state in memory only; no database is used
    #[arg(long, default_value = "false")]
    ephemeral: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "HOOKRELAY_LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting hookrelay-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = loaded_config.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Pick the ledger backend
    let (ledger, db_pool): (Arc<dyn DedupLedger>, Option<PgPool>) = if args.ephemeral {
        tracing::warn!("Running with an in-memory ledger, dedup state is lost on restart");
        let ledger: Arc<dyn DedupLedger> = Arc::new(MemoryLedger::new());
        (ledger, None)
    } else {
        let db_pool = connect_database(args.migrate).await?;
        let ledger: Arc<dyn DedupLedger> = Arc::new(PgLedger::new(DatabaseProcessor {
            pool: db_pool.clone(),
        }));
        (ledger, Some(db_pool))
    };

    // Dedup store, restored from the ledger
    let (ledger_tx, ledger_rx) = ledger_command_channel();
    let dedup = DedupStore::new(&loaded_config.dedup, ledger_tx);
    if let Err(e) = dedup.rehydrate(ledger.as_ref()).await {
        tracing::warn!(
            error = %e,
            "Failed to rehydrate dedup index, starting empty and retrying in the sweeper"
        );
    }

    // Shared pipeline state
    let (queue, dispatch_rx) = dispatch_queue();
    let stats = Arc::new(RelayStats::new());
    let classifier = ConfigStore::new(loaded_config.classifier.clone());
    let channels = ConfigStore::new(loaded_config.channels.clone());
    let mark_policy = loaded_config.dedup.high_value_mark;

    // Spawn background processors. The ledger writer has its own signal so
    // it outlives the workers and persists their last marks.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (ledger_shutdown_tx, ledger_shutdown_rx) = watch::channel(false);

    let writer_handle =
        tokio::spawn(LedgerWriter::new(ledger.clone(), ledger_rx).run(ledger_shutdown_rx));

    let worker_pool = DeliveryWorkerPool::new(
        dispatch_rx,
        Arc::new(WebhookDelivery::default()),
        channels.clone(),
        dedup.clone(),
        stats.clone(),
        &loaded_config.dispatch,
        mark_policy,
    );
    let workers = worker_pool.workers();
    let pool_handle = tokio::spawn(worker_pool.run(shutdown_rx.clone()));

    let sweeper = RetentionSweeper::new(dedup.clone(), ledger.clone(), loaded_config.dedup.clone());
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    // Create application state
    let gate = IngestionGate::new(
        dedup.clone(),
        queue.clone(),
        Arc::new(DiscordEmbedFormatter::new()),
        classifier.clone(),
        mark_policy,
        stats.clone(),
    );
    let state = AppState {
        gate,
        dedup,
        queue,
        ledger,
        stats,
        classifier,
        channels,
        workers,
    };

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader, loaded_config);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks: reload handler, then workers and sweeper, then
    // the ledger writer once nothing can produce more commands.
    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    for (name, handle) in [("delivery workers", pool_handle), ("sweeper", sweeper_handle)] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "Background task failed");
        }
    }
    let _ = ledger_shutdown_tx.send(true);
    if let Err(e) = writer_handle.await {
        tracing::error!(task = "ledger writer", error = %e, "Background task failed");
    }

    // Close database connections gracefully
    if let Some(db_pool) = db_pool {
        tracing::info!("Closing database connections...");
        db_pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Connect to Postgres using `DATABASE_URL`, optionally running migrations.
async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

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

    if migrate {
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

    Ok(db_pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
