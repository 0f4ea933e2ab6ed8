//! Storage seams.
//!
//! The core talks to two stores with different guarantees: a bit store for
//! attendance and a transactional ledger store for points. Both are traits so
//! backends can be swapped per deployment profile.

pub mod bit_store;
pub mod ledger_store;

pub use bit_store::{validate_width, BitStore, MAX_RANGE_WIDTH};
pub use ledger_store::{
    ApplyOutcome, BonusLogEntry, BonusTier, LedgerEntry, LedgerStore, PointsBalance, PointsTransaction,
    TransactionKind,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid bit range width {width}: must be 1..={max}")]
    InvalidBitRange { width: u32, max: u32 },

    #[error("Unknown transaction type code: {0}")]
    UnknownTransactionKind(i32),

    #[error("Invalid timestamp in ledger row: {0}")]
    InvalidTimestamp(String),

    #[error("Ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Storage backend not available: {0}")]
    Unsupported(String),

    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
