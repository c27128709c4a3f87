//! Bootstrap configuration for the FBR services
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (handled by each binary, clap also reads ENV)
//! 2. Environment variables (`GEMINI_API_KEY`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is not an error: every section falls back to defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Path to the SQLite record store (optional)
    ///
    /// If not specified, `<data_local_dir>/fbr/feedback.db` is used
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Gemini API key (optional, `GEMINI_API_KEY` takes priority)
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub genai: GenAiSettings,

    #[serde(default)]
    pub router: RouterSettings,

    #[serde(default)]
    pub generator: GeneratorSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Text generation service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenAiSettings {
    pub model: String,
    pub base_url: String,
    /// Client-side request budget
    pub requests_per_minute: u32,
    pub request_timeout_ms: u64,
}

impl Default for GenAiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-lite".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            requests_per_minute: 30,
            request_timeout_ms: 30_000,
        }
    }
}

impl GenAiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Live router timing and retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterSettings {
    /// How often the store re-evaluates the eligibility filter
    pub poll_interval_ms: u64,
    /// Delay after each processed record
    pub inter_record_delay_ms: u64,
    /// Extra pause after an Uncategorized classification
    pub uncategorized_pause_ms: u64,
    /// Classification attempts per record (including the first)
    pub max_attempts: u32,
    /// Wait after a rate-limit error
    pub rate_limit_cooldown_ms: u64,
    /// Wait after any other classification error
    pub transient_delay_ms: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            inter_record_delay_ms: 2_500,
            uncategorized_pause_ms: 10_000,
            max_attempts: 2,
            rate_limit_cooldown_ms: 60_000,
            transient_delay_ms: 5_000,
        }
    }
}

impl RouterSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn inter_record_delay(&self) -> Duration {
        Duration::from_millis(self.inter_record_delay_ms)
    }

    pub fn uncategorized_pause(&self) -> Duration {
        Duration::from_millis(self.uncategorized_pause_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn transient_delay(&self) -> Duration {
        Duration::from_millis(self.transient_delay_ms)
    }
}

/// Synthetic profile generator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub num_records: usize,
    pub batch_size: usize,
    /// Attempts per batch before the batch is skipped
    pub max_retries: u32,
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,
    pub inter_batch_delay_ms: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            num_records: 100,
            batch_size: 10,
            max_retries: 3,
            retry_delay_min_ms: 5_000,
            retry_delay_max_ms: 10_000,
            inter_batch_delay_ms: 1_500,
        }
    }
}

impl GeneratorSettings {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Number of batches needed to cover `num_records`
    pub fn batch_count(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.num_records.div_ceil(self.batch_size)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config
    /// locations are searched and defaults are used if none exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_file(),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
                let config = Self::from_toml_str(&content)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.genai.requests_per_minute == 0 {
            return Err(Error::Config(
                "genai.requests_per_minute must be at least 1".to_string(),
            ));
        }
        if self.router.max_attempts == 0 {
            return Err(Error::Config(
                "router.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.generator.batch_size == 0 {
            return Err(Error::Config(
                "generator.batch_size must be at least 1".to_string(),
            ));
        }
        if self.generator.max_retries == 0 {
            return Err(Error::Config(
                "generator.max_retries must be at least 1".to_string(),
            ));
        }
        if self.generator.retry_delay_min_ms > self.generator.retry_delay_max_ms {
            return Err(Error::Config(format!(
                "generator.retry_delay_min_ms ({}) exceeds retry_delay_max_ms ({})",
                self.generator.retry_delay_min_ms, self.generator.retry_delay_max_ms
            )));
        }
        Ok(())
    }

    /// Resolve the record store path: CLI/ENV override → TOML → OS default
    pub fn resolve_database_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.database_path.clone())
            .unwrap_or_else(default_database_path)
    }

    /// Resolve the Gemini API key
    ///
    /// **Priority:** ENV → TOML
    pub fn resolve_gemini_api_key(&self) -> Result<String> {
        let env_key = std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|key| is_valid_key(key));
        let toml_key = self
            .gemini_api_key
            .as_ref()
            .filter(|key| is_valid_key(key));

        match (env_key, toml_key) {
            (Some(key), toml_key) => {
                if toml_key.is_some() {
                    warn!(
                        "Gemini API key found in environment and TOML. Using environment (highest priority)."
                    );
                }
                info!("Gemini API key loaded from environment variable");
                Ok(key)
            }
            (None, Some(key)) => {
                info!("Gemini API key loaded from TOML config");
                Ok(key.clone())
            }
            (None, None) => Err(Error::Config(format!(
                "Gemini API key not configured. Set {} or gemini_api_key in the TOML config",
                GEMINI_API_KEY_ENV
            ))),
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// First existing platform config file, if any
///
/// Linux checks `~/.config/fbr/config.toml` then `/etc/fbr/config.toml`.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fbr").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fbr/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default record store location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fbr"))
        .unwrap_or_else(|| PathBuf::from("./fbr_data"))
        .join("feedback.db")
}
