//! Application configuration.
//!
//! Aggregates storage, reward policy, and reminder settings into a single
//! Config struct that can be loaded from YAML files or environment variables.

mod checkin;
mod storage;

pub use checkin::{
    CheckinConfig, ReminderConfig, DEFAULT_DAILY_POINTS, DEFAULT_REMINDER_THRESHOLD,
    DEFAULT_RETRO_COST, DEFAULT_RETRO_QUOTA,
};
pub use storage::{
    BitStoreConfig, BitStoreType, LedgerStoreConfig, LedgerStoreType, RedisConfig, SqliteConfig,
    StorageConfig,
};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CHECKIN_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CHECKIN";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CHECKIN_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid bonus rules: {0}")]
    InvalidRules(String),

    #[error("Invalid UTC offset: {0} minutes")]
    InvalidUtcOffset(i32),

    #[error("Invalid reward policy: {0}")]
    InvalidPolicy(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Reward policy.
    pub checkin: CheckinConfig,
    /// Reminder sweep.
    pub reminder: ReminderConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new("config", FileFormat::Yaml).required(false))
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory stores, default policy.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.ledger.store_type = LedgerStoreType::Memory;
        config
    }
}
