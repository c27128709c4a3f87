//! fbr-router - Live feedback router
//!
//! Watches the feedback record store for records whose assignment is still
//! unassigned, classifies each transcript with Gemini and writes the
//! handling queue back onto the record. Runs until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fbr_common::config::{ConfigSource, TomlConfig};
use fbr_common::genai::GeminiClient;
use fbr_common::{RecordStore, SqliteRecordStore};
use fbr_router::{ChangeDispatcher, ClassifierClient, DispatchTiming, RetryPolicy, RoutingTable};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Command-line arguments for fbr-router
#[derive(Parser, Debug)]
#[command(name = "fbr-router")]
#[command(about = "Routes new customer feedback records to handling queues")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "FBR_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite record store
    #[arg(short, long, env = "FBR_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    fbr_common::logging::init_tracing(&config.logging.level);

    info!("Starting fbr-router (live feedback router)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Configuration: {}", path.display()),
        ConfigSource::Defaults => warn!("No configuration file found, using built-in defaults"),
    }

    let api_key = config
        .resolve_gemini_api_key()
        .context("Gemini API key is required")?;

    let db_path = config.resolve_database_path(args.database);
    info!("Database: {}", db_path.display());
    let pool = fbr_common::db::init_database(&db_path)
        .await
        .context("Failed to open record store")?;

    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(pool, config.router.poll_interval()));

    let generator = Arc::new(
        GeminiClient::new(api_key, &config.genai).context("Failed to create Gemini client")?,
    );
    info!(
        model = %config.genai.model,
        requests_per_minute = config.genai.requests_per_minute,
        "Gemini client ready"
    );

    let classifier = Arc::new(ClassifierClient::new(
        generator,
        RetryPolicy::from_settings(&config.router),
    ));

    let routing = Arc::new(RoutingTable::default());
    info!(
        queues = ?routing.queues().collect::<Vec<_>>(),
        "Routing table loaded"
    );

    let cancel = CancellationToken::new();
    let batches = store
        .subscribe_unassigned(cancel.clone())
        .await
        .context("Failed to subscribe to unassigned records")?;

    let dispatcher = ChangeDispatcher::new(
        classifier,
        store,
        routing,
        DispatchTiming::from_settings(&config.router),
    );
    let mut dispatch_task = tokio::spawn(dispatcher.run(batches, cancel.clone()));

    info!("Live router is active. Press Ctrl+C to stop.");

    let finished = tokio::select! {
        _ = shutdown_signal() => None,
        joined = &mut dispatch_task => Some(joined),
    };

    // Stops the store poller as well as the dispatcher
    cancel.cancel();
    let joined = match finished {
        Some(joined) => joined,
        None => dispatch_task.await,
    };
    let stats = joined.context("Dispatcher task failed")?;

    info!(
        routed = stats.routed,
        skipped = stats.skipped,
        update_failures = stats.update_failures,
        "Listener stopped"
    );
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
