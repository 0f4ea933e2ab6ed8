//! Storage configuration types.

use serde::Deserialize;

/// Attendance bit store discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitStoreType {
    #[default]
    Memory,
    Redis,
}

/// Points ledger store discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStoreType {
    Memory,
    #[default]
    Sqlite,
}

/// Storage configuration for both stores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Attendance bitmaps.
    pub bits: BitStoreConfig,
    /// Points ledger.
    pub ledger: LedgerStoreConfig,
}

/// Attendance bit store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BitStoreConfig {
    #[serde(rename = "type")]
    pub store_type: BitStoreType,
    /// Redis-specific configuration.
    pub redis: RedisConfig,
    /// Prefix for every attendance key.
    pub key_prefix: String,
}

impl Default for BitStoreConfig {
    fn default() -> Self {
        Self {
            store_type: BitStoreType::Memory,
            redis: RedisConfig::default(),
            key_prefix: "sunflower".to_string(),
        }
    }
}

/// Redis-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Points ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerStoreConfig {
    #[serde(rename = "type")]
    pub store_type: LedgerStoreType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the database file, or `:memory:`.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "./data/ledger.db".to_string(),
        }
    }
}
