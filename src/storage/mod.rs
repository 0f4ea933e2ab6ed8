//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{BitStoreType, LedgerStoreType, StorageConfig};
use crate::interfaces::{BitStore, LedgerStore, Result};

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::{MemoryBitStore, MemoryLedgerStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedgerStore;

#[cfg(feature = "redis")]
pub use redis::RedisBitStore;

/// The two stores the check-in service runs on.
#[derive(Clone)]
pub struct Stores {
    pub bits: Arc<dyn BitStore>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            bits: Arc::new(MemoryBitStore::new()),
            ledger: Arc::new(MemoryLedgerStore::new()),
        }
    }
}

/// Initialize storage based on configuration.
///
/// Selecting a backend whose cargo feature is disabled returns
/// [`StorageError::Unsupported`](crate::interfaces::StorageError::Unsupported).
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    let bits = init_bit_store(config).await?;
    let ledger = init_ledger_store(config).await?;
    Ok(Stores { bits, ledger })
}

async fn init_bit_store(config: &StorageConfig) -> Result<Arc<dyn BitStore>> {
    match config.bits.store_type {
        BitStoreType::Memory => {
            info!("Bit store: memory");
            Ok(Arc::new(MemoryBitStore::new()))
        }
        #[cfg(feature = "redis")]
        BitStoreType::Redis => {
            info!("Bit store: redis at {}", config.bits.redis.url);
            let url = config.bits.redis.url.as_str();
            let store =
                crate::utils::bootstrap::connect_with_retry("redis", url, || RedisBitStore::new(url))
                    .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        BitStoreType::Redis => Err(crate::interfaces::StorageError::Unsupported(
            "redis bit store requires the 'redis' feature".to_string(),
        )),
    }
}

async fn init_ledger_store(config: &StorageConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.ledger.store_type {
        LedgerStoreType::Memory => {
            info!("Ledger store: memory");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
        #[cfg(feature = "sqlite")]
        LedgerStoreType::Sqlite => {
            let path = config.ledger.sqlite.path.as_str();
            info!("Ledger store: sqlite at {}", path);
            let store = SqliteLedgerStore::new(open_sqlite_pool(path).await?);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        LedgerStoreType::Sqlite => Err(crate::interfaces::StorageError::Unsupported(
            "sqlite ledger store requires the 'sqlite' feature".to_string(),
        )),
    }
}

/// Open a pool for `path`, creating the parent directory as needed.
///
/// `:memory:` gets a single connection so every query sees the same database.
#[cfg(feature = "sqlite")]
pub async fn open_sqlite_pool(path: &str) -> Result<sqlx::SqlitePool> {
    use sqlx::sqlite::SqlitePoolOptions;

    if path == ":memory:" {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        return Ok(pool);
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_memory_stores() {
        let mut config = StorageConfig::default();
        config.ledger.store_type = LedgerStoreType::Memory;

        let stores = init_storage(&config).await.unwrap();
        assert!(!stores.bits.set_bit("k", 0).await.unwrap());
        assert!(stores.ledger.balance(1).await.unwrap().is_none());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_init_sqlite_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.ledger.sqlite.path = dir
            .path()
            .join("nested/ledger.db")
            .to_string_lossy()
            .into_owned();

        let stores = init_storage(&config).await.unwrap();
        assert!(stores.ledger.balance(1).await.unwrap().is_none());
        assert!(dir.path().join("nested").exists());
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_without_feature_is_unsupported() {
        let mut config = StorageConfig::default();
        config.bits.store_type = BitStoreType::Redis;

        let result = init_storage(&config).await;
        assert!(matches!(result, Err(crate::interfaces::StorageError::Unsupported(_))));
    }
}
