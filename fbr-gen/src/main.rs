//! fbr-gen - Synthetic feedback record producer
//!
//! Asks Gemini for batches of customer profiles and inserts them into the
//! record store as unassigned records for fbr-router to pick up.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fbr_common::config::{ConfigSource, TomlConfig};
use fbr_common::genai::GeminiClient;
use fbr_common::SqliteRecordStore;
use fbr_gen::ProfileGenerator;
use tracing::{info, warn};

/// Command-line arguments for fbr-gen
#[derive(Parser, Debug)]
#[command(name = "fbr-gen")]
#[command(about = "Generates synthetic customer feedback records")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "FBR_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite record store
    #[arg(short, long, env = "FBR_DATABASE")]
    database: Option<PathBuf>,

    /// Number of profiles to generate (overrides generator.num_records)
    #[arg(short = 'n', long, env = "FBR_COUNT")]
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(count) = args.count {
        config.generator.num_records = count;
    }
    config.validate().context("Invalid configuration")?;

    fbr_common::logging::init_tracing(&config.logging.level);

    info!("Starting fbr-gen (synthetic record producer)");
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
    let store = Arc::new(SqliteRecordStore::new(pool, config.router.poll_interval()));

    let generator = Arc::new(
        GeminiClient::new(api_key, &config.genai).context("Failed to create Gemini client")?,
    );

    let report = ProfileGenerator::new(generator, store.clone(), config.generator.clone())
        .run()
        .await;

    if report.batches_failed > 0 {
        warn!(
            batches_failed = report.batches_failed,
            "Some batches could not be generated"
        );
    }
    let total = store.count().await.context("Failed to count records")?;
    info!(
        uploaded = report.profiles_uploaded,
        total_records = total,
        "Data generation and upload complete"
    );
    Ok(())
}
