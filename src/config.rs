//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::schedule::Recurrence;
use crate::storage::{RetentionPolicy, StoreConfig, DEFAULT_TIMESTAMP_FORMAT};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Usage log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Defaults to `<data_dir>/archive`
    #[serde(default)]
    pub archive_dir: Option<String>,

    #[serde(default = "default_store_file")]
    pub store_file: String,

    #[serde(default = "default_export_file")]
    pub export_file: String,

    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default)]
    pub keep_store_archive: bool,

    #[serde(default = "default_keep_export_archive")]
    pub keep_export_archive: bool,

    /// Export every appended row, not just scheduled ones
    #[serde(default)]
    pub test_mode: bool,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("wellswitch").to_string_lossy().to_string())
        .unwrap_or_else(|| "./wellswitch_data".to_string())
}

fn default_store_file() -> String {
    "Data.json".to_string()
}

fn default_export_file() -> String {
    "Data.csv".to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_keep_export_archive() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            archive_dir: None,
            store_file: default_store_file(),
            export_file: default_export_file(),
            timestamp_format: default_timestamp_format(),
            keep_store_archive: false,
            keep_export_archive: default_keep_export_archive(),
            test_mode: false,
        }
    }
}

impl StorageConfig {
    /// Resolve into the store's own configuration
    pub fn store_config(&self) -> StoreConfig {
        let data_dir = expand_home(&self.data_dir);
        let archive_dir = self
            .archive_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| data_dir.join("archive"));

        StoreConfig {
            data_dir,
            archive_dir,
            store_file: self.store_file.clone(),
            export_file: self.export_file.clone(),
            timestamp_format: self.timestamp_format.clone(),
            retention: RetentionPolicy {
                keep_store_archive: self.keep_store_archive,
                keep_export_archive: self.keep_export_archive,
            },
        }
    }
}

/// Controller timing and output polarity
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Period of the recharge and valve duty-cycle timers
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Ticks the pressure switch needs before the well counts as charged
    #[serde(default = "default_recharge_ticks")]
    pub recharge_ticks: u32,

    #[serde(default = "default_boiler_confirm")]
    pub boiler_confirm_ms: u64,

    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Relays energise on a low output
    #[serde(default = "default_relays_active_low")]
    pub relays_active_low: bool,
}

fn default_tick_interval() -> u64 {
    1000 // 1 second
}

fn default_recharge_ticks() -> u32 {
    5
}

fn default_boiler_confirm() -> u64 {
    100
}

fn default_debounce() -> u64 {
    50
}

fn default_relays_active_low() -> bool {
    true
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            recharge_ticks: default_recharge_ticks(),
            boiler_confirm_ms: default_boiler_confirm(),
            debounce_ms: default_debounce(),
            relays_active_low: default_relays_active_low(),
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn boiler_confirm(&self) -> Duration {
        Duration::from_millis(self.boiler_confirm_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Recurring maintenance
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_export_schedule")]
    pub export: Recurrence,

    #[serde(default = "default_rotate_schedule")]
    pub rotate: Recurrence,
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_export_schedule() -> Recurrence {
    Recurrence::daily([hour(7), hour(19)])
}

fn default_rotate_schedule() -> Recurrence {
    Recurrence::monthly(1, NaiveTime::MIN)
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            export: default_export_schedule(),
            rotate: default_rotate_schedule(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("wellswitch").join("config.toml")),
            Some(PathBuf::from("/etc/wellswitch/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        // Storage overrides
        if let Ok(data_dir) = std::env::var("WELLSWITCH_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Ok(archive_dir) = std::env::var("WELLSWITCH_ARCHIVE_DIR") {
            self.storage.archive_dir = Some(archive_dir);
        }

        // Logging overrides
        if let Ok(level) = std::env::var("WELLSWITCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WELLSWITCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Expand a leading `~/` against the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Wellswitch Configuration
#
# Environment variables override these settings:
# - WELLSWITCH_DATA_DIR
# - WELLSWITCH_ARCHIVE_DIR
# - WELLSWITCH_LOG_LEVEL
# - WELLSWITCH_LOG_FORMAT

[storage]
# Directory holding Data.json and Data.csv
data_dir = "~/.local/share/wellswitch"

# Where rotated copies go (defaults to <data_dir>/archive)
# archive_dir = "~/.local/share/wellswitch/archive"

store_file = "Data.json"
export_file = "Data.csv"

# chrono format of the Date column
timestamp_format = "%m/%d/%Y %H:%M:%S"

# Which archived copies survive a rotation
keep_store_archive = false
keep_export_archive = true

# Export every appended row instead of only on schedule
test_mode = false

[control]
# Period of the recharge and valve timers (ms)
tick_interval_ms = 1000

# Ticks before the well counts as recharged
recharge_ticks = 5

# How long the boiler must keep calling before a valve is chosen (ms)
boiler_confirm_ms = 100

# Settle window for the physical inputs (ms)
debounce_ms = 50

# Relays energise on a low output
relays_active_low = true

[schedule]
# kind = "every" (seconds), "daily" (at = [...]) or "monthly" (day, at)
export = { kind = "daily", at = ["07:00:00", "19:00:00"] }
rotate = { kind = "monthly", day = 1, at = "00:00:00" }

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
