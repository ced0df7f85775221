//! Pronote Notifications server
//!
//! Main entry point that wires all crates together, starts the sync timers,
//! and serves the app API.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use pronotif_api::AppState;
use pronotif_api::jwt::{JwtDecoder, JwtEncoder};
use pronotif_core::config::{AppConfig, LogFormat};
use pronotif_core::error::AppError;
use pronotif_database::{Database, PgStore};
use pronotif_portal::{CasResolver, HttpPortalClient, SessionGateway};
use pronotif_push::FcmTransport;
use pronotif_service::{AccountService, CredentialTracker, NotificationDispatcher};
use pronotif_worker::{SyncScheduler, SyncScope, Synchronizer};

/// Pronote Notifications: polls school portals and pushes new assignments
/// and grades to the students' phones.
#[derive(Debug, Parser)]
#[command(name = "pronotif-server", version, about, long_about = None)]
struct Cli {
    /// Run a sync cycle right after startup, for one username or `all`
    #[arg(long, value_name = "USERNAME|all", num_args = 0..=1, default_missing_value = "all")]
    sync: Option<SyncScope>,

    /// Run an invalidation-recheck cycle right after startup
    #[arg(long)]
    checkinv: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env = std::env::var("PRONOTIF_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, cli).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, cli: Cli) -> Result<(), AppError> {
    tracing::info!("Starting Pronote Notifications v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Account store ────────────────────────────────────
    let db = Database::open(&config.database).await?;
    let store = Arc::new(PgStore::new(db.pool().clone()));

    // ── Step 2: Portal access ────────────────────────────────────
    let portal_client = Arc::new(HttpPortalClient::new(&config.portal)?);
    let resolver = Arc::new(CasResolver::new(SessionGateway::new(portal_client)));

    // ── Step 3: Services ─────────────────────────────────────────
    let credentials = Arc::new(CredentialTracker::new(store.clone()));
    let transport = Arc::new(FcmTransport::new(config.push.clone())?);
    let dispatcher = NotificationDispatcher::new(store.clone(), transport);
    let accounts = Arc::new(AccountService::new(
        store.clone(),
        Arc::clone(&resolver),
        Arc::clone(&credentials),
    ));

    // ── Step 4: Synchronizer and timers ──────────────────────────
    let synchronizer = Arc::new(Synchronizer::new(
        store,
        resolver,
        credentials,
        dispatcher,
        &config.sync,
        config.portal.grade_period.clone(),
    ));

    let scheduler = if config.sync.enabled {
        let scheduler = SyncScheduler::new(Arc::clone(&synchronizer), config.sync.clone()).await?;
        scheduler.register_cycles().await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Sync timers disabled");
        None
    };

    if let Some(scope) = cli.sync {
        let synchronizer = Arc::clone(&synchronizer);
        tokio::spawn(async move {
            tracing::info!(scope = %scope, "Running startup sync cycle");
            if let Err(e) = synchronizer.run_sync_cycle(&scope).await {
                tracing::error!("Startup sync cycle failed: {}", e);
            }
        });
    }
    if cli.checkinv {
        let synchronizer = Arc::clone(&synchronizer);
        tokio::spawn(async move {
            tracing::info!("Running startup recheck cycle");
            if let Err(e) = synchronizer.run_recheck_cycle().await {
                tracing::error!("Startup recheck cycle failed: {}", e);
            }
        });
    }

    // ── Step 5: HTTP server with graceful shutdown ───────────────
    let state = AppState::new(
        accounts,
        JwtEncoder::new(&config.auth),
        JwtDecoder::new(&config.auth),
    );

    pronotif_api::serve(&config.server, state, async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    })
    .await?;

    // ── Step 6: Stop timers and close the pool ───────────────────
    if let Some(scheduler) = scheduler {
        let grace = config.server.shutdown_timeout();
        match tokio::time::timeout(grace, scheduler.shutdown()).await {
            Ok(result) => result?,
            Err(_) => tracing::warn!("Sync scheduler did not stop within {}s", grace.as_secs()),
        }
    }
    db.close().await;

    tracing::info!("Pronote Notifications shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
