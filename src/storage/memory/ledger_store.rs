//! In-memory LedgerStore implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock, Semaphore};

use crate::interfaces::{
    ApplyOutcome, BonusTier, LedgerEntry, LedgerStore, PointsBalance, PointsTransaction, Result,
    StorageError,
};

#[derive(Default)]
struct LedgerState {
    balances: HashMap<i64, PointsBalance>,
    transactions: Vec<PointsTransaction>,
    references: HashSet<(i64, String)>,
    bonus_log: HashSet<(i64, String, BonusTier)>,
    next_id: i64,
}

/// Ledger held in memory behind a single mutex.
///
/// Holding the mutex for the whole of `apply` gives the same isolation the
/// SQLite store gets from `BEGIN IMMEDIATE`.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<LedgerState>,
    fail_on_apply: RwLock<bool>,
    fail_on_read: RwLock<bool>,
    apply_gate: RwLock<Option<Arc<Semaphore>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_apply(&self, fail: bool) {
        *self.fail_on_apply.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Hold every `apply` until the gate hands out a permit, one per call.
    pub async fn set_apply_gate(&self, gate: Option<Arc<Semaphore>>) {
        *self.apply_gate.write().await = gate;
    }

    /// Every transaction for a user in creation order. Test helper.
    pub async fn history(&self, user_id: i64) -> Vec<PointsTransaction> {
        self.state
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of bonus-log rows for a user. Test helper.
    pub async fn bonus_log_len(&self, user_id: i64) -> usize {
        self.state
            .lock()
            .await
            .bonus_log
            .iter()
            .filter(|(user, _, _)| *user == user_id)
            .count()
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Injected("ledger read".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn apply(&self, entry: LedgerEntry) -> Result<ApplyOutcome> {
        let gate = self.apply_gate.read().await.clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| StorageError::Injected("ledger gate closed".to_string()))?
                .forget();
        }
        if *self.fail_on_apply.read().await {
            return Err(StorageError::Injected("ledger apply".to_string()));
        }

        let mut state = self.state.lock().await;
        let current = state
            .balances
            .get(&entry.user_id)
            .copied()
            .unwrap_or_else(|| PointsBalance::empty(entry.user_id));

        if let Some(min) = entry.min_balance {
            if current.points < min {
                return Ok(ApplyOutcome::Insufficient {
                    balance: current.points,
                });
            }
        }

        let reference_key = (entry.user_id, entry.reference.clone());
        if state.references.contains(&reference_key) {
            return Ok(ApplyOutcome::Duplicate);
        }
        let bonus_key = entry
            .bonus
            .as_ref()
            .map(|b| (entry.user_id, b.year_month.clone(), b.tier));
        if let Some(key) = &bonus_key {
            if state.bonus_log.contains(key) {
                return Ok(ApplyOutcome::Duplicate);
            }
        }

        let updated = PointsBalance {
            user_id: entry.user_id,
            points: current.points + entry.delta,
            lifetime_points: current.lifetime_points + entry.delta.max(0),
        };

        state.next_id += 1;
        let transaction = PointsTransaction {
            id: state.next_id,
            user_id: entry.user_id,
            delta: entry.delta,
            balance: updated.points,
            kind: entry.kind,
            reference: entry.reference,
            description: entry.description,
            created_at: Utc::now(),
        };

        state.references.insert(reference_key);
        if let Some(key) = bonus_key {
            state.bonus_log.insert(key);
        }
        state.balances.insert(entry.user_id, updated);
        state.transactions.push(transaction.clone());

        Ok(ApplyOutcome::Applied(transaction))
    }

    async fn balance(&self, user_id: i64) -> Result<Option<PointsBalance>> {
        self.check_read().await?;
        Ok(self.state.lock().await.balances.get(&user_id).copied())
    }

    async fn transactions(
        &self,
        user_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PointsTransaction>, u64)> {
        self.check_read().await?;
        let state = self.state.lock().await;
        let mine: Vec<&PointsTransaction> = state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .collect();
        let total = mine.len() as u64;
        let page = mine
            .into_iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn has_reference(&self, user_id: i64, reference: &str) -> Result<bool> {
        self.check_read().await?;
        let state = self.state.lock().await;
        Ok(state
            .references
            .contains(&(user_id, reference.to_string())))
    }

    async fn bonus_tiers(&self, user_id: i64, year_month: &str) -> Result<Vec<BonusTier>> {
        self.check_read().await?;
        let state = self.state.lock().await;
        let mut tiers: Vec<BonusTier> = state
            .bonus_log
            .iter()
            .filter(|(user, month, _)| *user == user_id && month == year_month)
            .map(|(_, _, tier)| *tier)
            .collect();
        tiers.sort();
        Ok(tiers)
    }
}
