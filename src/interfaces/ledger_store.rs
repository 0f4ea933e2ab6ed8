//! Points ledger storage interface.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Result, StorageError};

/// Why a ledger transaction happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Daily,
    ConsecutiveBonus,
    Retroactive,
}

impl TransactionKind {
    /// Stable code persisted in the `transaction_type` column.
    pub fn code(self) -> i32 {
        match self {
            TransactionKind::Daily => 1,
            TransactionKind::ConsecutiveBonus => 2,
            TransactionKind::Retroactive => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(TransactionKind::Daily),
            2 => Ok(TransactionKind::ConsecutiveBonus),
            3 => Ok(TransactionKind::Retroactive),
            other => Err(StorageError::UnknownTransactionKind(other)),
        }
    }
}

/// One threshold in the consecutive-day reward table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BonusTier(pub i32);

impl fmt::Display for BonusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsBalance {
    pub user_id: i64,
    /// Spendable points. Never negative after a commit.
    pub points: i64,
    /// Sum of every positive delta ever applied.
    pub lifetime_points: i64,
}

impl PointsBalance {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            points: 0,
            lifetime_points: 0,
        }
    }
}

/// Append-only ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub delta: i64,
    /// Balance after applying `delta`.
    pub balance: i64,
    pub kind: TransactionKind,
    /// Per-user unique business key, e.g. `daily:2025-01-10`.
    pub reference: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Bonus-log row written in the same transaction as its grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusLogEntry {
    /// `YYYYMM`.
    pub year_month: String,
    pub tier: BonusTier,
    pub description: String,
}

/// A mutation request for [`LedgerStore::apply`].
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user_id: i64,
    pub delta: i64,
    pub kind: TransactionKind,
    pub reference: String,
    pub description: String,
    /// When set, the write only happens if the balance read inside the same
    /// transaction is at least this value.
    pub min_balance: Option<i64>,
    /// Bonus-log row to insert alongside the transaction.
    pub bonus: Option<BonusLogEntry>,
}

/// What a ledger write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Balance, transaction and optional bonus row committed together.
    Applied(PointsTransaction),
    /// The reference or bonus tier already existed; nothing was written.
    Duplicate,
    /// `min_balance` was not met; nothing was written.
    Insufficient { balance: i64 },
}

/// Interface for the durable points ledger.
///
/// `apply` is the only mutation. It reads the balance (a missing row is a
/// zero balance), appends the transaction with the post-delta balance,
/// upserts the balance row and optionally appends a bonus-log row, all in
/// one isolated transaction. Concurrent calls for the same user serialize,
/// so no balance update is lost and the snapshot chain stays exact.
///
/// # Implementations
///
/// - `SqliteLedgerStore`: SQLite via sqlx, `BEGIN IMMEDIATE` transactions
/// - `MemoryLedgerStore`: in-memory, with failure injection
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn apply(&self, entry: LedgerEntry) -> Result<ApplyOutcome>;

    /// Current balance row, `None` for a user who never earned points.
    async fn balance(&self, user_id: i64) -> Result<Option<PointsBalance>>;

    /// Page of transactions newest-first, plus the user's total count.
    async fn transactions(
        &self,
        user_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PointsTransaction>, u64)>;

    async fn has_reference(&self, user_id: i64, reference: &str) -> Result<bool>;

    /// Tiers already granted to the user for a `YYYYMM` month.
    async fn bonus_tiers(&self, user_id: i64, year_month: &str) -> Result<Vec<BonusTier>>;
}
