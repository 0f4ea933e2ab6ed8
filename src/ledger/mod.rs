//! Points ledger.
//!
//! Owns the balance-and-transaction-log invariant: every mutation goes
//! through [`LedgerStore::apply`], which updates the balance row and appends
//! the transaction (with its post-delta balance) in one durable transaction.
//!
//! Every write carries a per-user unique reference. Replaying a reference
//! is reported as [`Grant::Duplicate`] and never writes twice, which is what
//! makes daily grants and streak bonuses exactly-once under retries.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::bonus::BonusRule;
use crate::calendar::YearMonth;
use crate::interfaces::{
    ApplyOutcome, BonusLogEntry, BonusTier, LedgerEntry, LedgerStore, PointsTransaction, Result,
    StorageError, TransactionKind,
};

/// Page size used when the caller asks for none or too many.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 50;

/// Reference of the daily award for `date`.
pub fn daily_reference(date: NaiveDate) -> String {
    format!("daily:{}", date)
}

/// Reference of the retroactive debit for `date`.
pub fn retro_reference(date: NaiveDate) -> String {
    format!("retro:{}", date)
}

/// Reference of a streak bonus for one month and tier.
pub fn bonus_reference(month: YearMonth, tier: BonusTier) -> String {
    format!("bonus:{}:{}", month.compact(), tier)
}

/// Result of a credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    Applied(PointsTransaction),
    /// The reference was already recorded, by this or a concurrent request.
    Duplicate,
}

/// Balance summary for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    pub points: i64,
    pub lifetime_points: i64,
}

/// Pagination window for transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordsQuery {
    pub offset: u32,
    pub limit: u32,
}

impl RecordsQuery {
    /// Clamp raw request values: a limit outside `1..=MAX_PAGE_LIMIT` falls
    /// back to `DEFAULT_PAGE_LIMIT`, a negative offset to 0.
    pub fn clamped(offset: i64, limit: i64) -> Self {
        let limit = if (1..=i64::from(MAX_PAGE_LIMIT)).contains(&limit) {
            limit as u32
        } else {
            DEFAULT_PAGE_LIMIT
        };
        let offset = offset.clamp(0, i64::from(u32::MAX)) as u32;
        Self { offset, limit }
    }
}

impl Default for RecordsQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of transaction history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordsPage {
    pub total: u64,
    pub has_more: bool,
    pub records: Vec<PointsTransaction>,
}

/// Facade over a [`LedgerStore`].
#[derive(Clone)]
pub struct PointsLedger {
    store: Arc<dyn LedgerStore>,
}

impl PointsLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Credit (or, with a negative delta, debit without a balance check).
    ///
    /// Callers debiting through this path must have confirmed sufficiency
    /// themselves; [`PointsLedger::debit`] does the check transactionally.
    pub async fn add_points(
        &self,
        user_id: i64,
        delta: i64,
        kind: TransactionKind,
        description: impl Into<String>,
        reference: impl Into<String>,
    ) -> Result<Grant> {
        let entry = LedgerEntry {
            user_id,
            delta,
            kind,
            reference: reference.into(),
            description: description.into(),
            min_balance: None,
            bonus: None,
        };
        self.credit(entry).await
    }

    /// Debit `cost` only if the balance read in the same transaction covers it.
    pub async fn debit(
        &self,
        user_id: i64,
        cost: i64,
        kind: TransactionKind,
        description: impl Into<String>,
        reference: impl Into<String>,
    ) -> Result<ApplyOutcome> {
        let entry = LedgerEntry {
            user_id,
            delta: -cost,
            kind,
            reference: reference.into(),
            description: description.into(),
            min_balance: Some(cost),
            bonus: None,
        };
        self.store.apply(entry).await
    }

    /// Grant a streak bonus and write its bonus-log row atomically.
    pub async fn grant_bonus(
        &self,
        user_id: i64,
        month: YearMonth,
        rule: &BonusRule,
    ) -> Result<Grant> {
        let entry = LedgerEntry {
            user_id,
            delta: rule.points,
            kind: TransactionKind::ConsecutiveBonus,
            reference: bonus_reference(month, rule.tier),
            description: rule.description.clone(),
            min_balance: None,
            bonus: Some(BonusLogEntry {
                year_month: month.compact(),
                tier: rule.tier,
                description: rule.description.clone(),
            }),
        };
        self.credit(entry).await
    }

    async fn credit(&self, entry: LedgerEntry) -> Result<Grant> {
        let user_id = entry.user_id;
        let reference = entry.reference.clone();
        match self.store.apply(entry).await? {
            ApplyOutcome::Applied(transaction) => {
                info!(
                    user_id,
                    reference = %reference,
                    delta = transaction.delta,
                    balance = transaction.balance,
                    "points granted"
                );
                Ok(Grant::Applied(transaction))
            }
            ApplyOutcome::Duplicate => Ok(Grant::Duplicate),
            ApplyOutcome::Insufficient { balance } => Err(StorageError::Invariant(format!(
                "unguarded credit {} for user {} reported insufficient balance {}",
                reference, user_id, balance
            ))),
        }
    }

    pub async fn summary(&self, user_id: i64) -> Result<PointsSummary> {
        let balance = self.store.balance(user_id).await?;
        Ok(balance
            .map(|b| PointsSummary {
                points: b.points,
                lifetime_points: b.lifetime_points,
            })
            .unwrap_or(PointsSummary {
                points: 0,
                lifetime_points: 0,
            }))
    }

    pub async fn records(&self, user_id: i64, query: RecordsQuery) -> Result<RecordsPage> {
        let (records, total) = self
            .store
            .transactions(user_id, query.offset, query.limit)
            .await?;
        let has_more = records.len() == query.limit as usize
            && total > u64::from(query.offset) + u64::from(query.limit);
        Ok(RecordsPage {
            total,
            has_more,
            records,
        })
    }

    pub async fn has_reference(&self, user_id: i64, reference: &str) -> Result<bool> {
        self.store.has_reference(user_id, reference).await
    }

    pub async fn bonus_tiers(&self, user_id: i64, month: YearMonth) -> Result<Vec<BonusTier>> {
        self.store.bonus_tiers(user_id, &month.compact()).await
    }
}
