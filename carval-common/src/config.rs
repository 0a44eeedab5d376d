//! Configuration loading and root folder resolution
//!
//! Two-tier configuration: a minimal TOML bootstrap file (paths, logging,
//! tunables) plus built-in defaults in code. Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `CARVAL_ROOT` environment variable
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bootstrap configuration loaded from `carval.toml`
///
/// These settings cannot change during runtime; restart to pick up edits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file (default: `<root>/carval.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Path to the business-rules JSON file
    /// (default: `<root>/business_rules.json`)
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scraper discipline tunables
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Valuation resolver tunables
    #[serde(default)]
    pub valuation: ValuationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

/// Scraper discipline tunables, enforced per adapter instance
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Minimum delay between requests to one source, in milliseconds
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Maximum attempts per request (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum listings to collect per source per run
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Source order: first entry is the primary source
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_scrape_timeout_secs(),
            max_results: default_max_results(),
            sources: default_sources(),
        }
    }
}

/// Valuation resolver tunables.
///
/// The thresholds here are empirically chosen rather than derived, so they
/// are configuration, not business logic.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    /// Stored valuations younger than this are served from cache
    #[serde(default = "default_freshness_days")]
    pub freshness_days: i64,

    /// Listings older than this are purged by the cleanup pass
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Only listings observed within this window feed an aggregate
    #[serde(default = "default_listing_window_days")]
    pub listing_window_days: i64,

    /// Below this sample size the resolver queries the next source
    #[serde(default = "default_min_sample")]
    pub min_sample: u32,

    /// At or above this sample size market data is labeled high confidence
    #[serde(default = "default_high_confidence_sample")]
    pub high_confidence_sample: u32,

    /// Listings farther than this many MADs from the median are dropped
    #[serde(default = "default_mad_multiplier")]
    pub mad_multiplier: f64,

    /// VIN decode request timeout in seconds
    #[serde(default = "default_decode_timeout_secs")]
    pub decode_timeout_secs: u64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            freshness_days: default_freshness_days(),
            retention_days: default_retention_days(),
            listing_window_days: default_listing_window_days(),
            min_sample: default_min_sample(),
            high_confidence_sample: default_high_confidence_sample(),
            mad_multiplier: default_mad_multiplier(),
            decode_timeout_secs: default_decode_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_scrape_timeout_secs() -> u64 {
    30
}

fn default_max_results() -> u32 {
    100
}

fn default_sources() -> Vec<String> {
    vec![
        "cars_com".to_string(),
        "autotrader".to_string(),
        "cargurus".to_string(),
    ]
}

fn default_freshness_days() -> i64 {
    7
}

fn default_retention_days() -> i64 {
    90
}

fn default_listing_window_days() -> i64 {
    60
}

fn default_min_sample() -> u32 {
    5
}

fn default_high_confidence_sample() -> u32 {
    10
}

fn default_mad_multiplier() -> f64 {
    3.5
}

fn default_decode_timeout_secs() -> u64 {
    10
}

impl TomlConfig {
    /// Load `carval.toml` from the root folder, or defaults if absent
    pub fn load(root_folder: &Path) -> Result<Self> {
        let path = root_folder.join("carval.toml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Database path, defaulting under the root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join("carval.db"))
    }

    /// Business-rules path, defaulting under the root folder
    pub fn rules_path(&self, root_folder: &Path) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| root_folder.join("business_rules.json"))
    }
}

/// Resolve the root data folder
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("CARVAL_ROOT") {
        return PathBuf::from(path);
    }

    // Priority 3: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("carval"))
        .unwrap_or_else(|| PathBuf::from("./carval_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_wins() {
        let root = resolve_root_folder(Some("/tmp/carval-test"));
        assert_eq!(root, PathBuf::from("/tmp/carval-test"));
    }

    #[test]
    fn defaults_when_no_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TomlConfig::load(dir.path()).unwrap();
        assert_eq!(config.valuation.freshness_days, 7);
        assert_eq!(config.scrape.rate_limit_ms, 2000);
        assert_eq!(config.scrape.sources[0], "cars_com");
    }

    #[test]
    fn parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("carval.toml"),
            r#"
            [valuation]
            freshness_days = 3

            [scrape]
            rate_limit_ms = 500
            "#,
        )
        .unwrap();

        let config = TomlConfig::load(dir.path()).unwrap();
        assert_eq!(config.valuation.freshness_days, 3);
        // untouched fields keep their defaults
        assert_eq!(config.valuation.retention_days, 90);
        assert_eq!(config.scrape.rate_limit_ms, 500);
        assert_eq!(config.scrape.max_attempts, 3);
    }

    #[test]
    fn database_path_defaults_under_root() {
        let config = TomlConfig::default();
        let root = PathBuf::from("/data/carval");
        assert_eq!(
            config.database_path(&root),
            PathBuf::from("/data/carval/carval.db")
        );
    }
}
