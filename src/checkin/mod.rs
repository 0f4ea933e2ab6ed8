//! Check-in orchestration.
//!
//! Attendance and points live in two stores with no shared transaction.
//! The attendance bit is written first and its previous value decides who
//! won a race; the ledger write follows.
//!
//! A daily bit is sticky: if the grant fails the bit stays, and the next
//! request for the day finds it set and retries the grant. A retro bit is
//! rolled back when the debit fails; if the rollback itself fails the error
//! is [`CheckinError::InconsistentState`] and needs reconciliation. The retro
//! write and its rollback run detached from the caller.

mod outcome;
mod policy;

pub use outcome::{DailyCheckin, DailyStatus, MonthCalendar, RetroCheckin};
pub use policy::RewardPolicy;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{error, info, warn};

use crate::attendance::{AttendanceBook, AttendanceKeys, MonthAttendance};
use crate::bonus::{BonusEngine, BonusReport, BonusRules};
use crate::calendar::YearMonth;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ConfigError};
use crate::error::{CheckinError, RetroDateRejection};
use crate::interfaces::{ApplyOutcome, PointsTransaction, StorageError, TransactionKind};
use crate::ledger::{
    daily_reference, retro_reference, Grant, PointsLedger, PointsSummary, RecordsPage,
    RecordsQuery,
};
use crate::storage::Stores;
use crate::validator::RetroValidator;

const DAILY_DESCRIPTION: &str = "Daily check-in reward";

/// Entry point for every check-in operation.
#[derive(Clone)]
pub struct CheckinService {
    attendance: AttendanceBook,
    ledger: PointsLedger,
    bonuses: BonusEngine,
    validator: RetroValidator,
    policy: RewardPolicy,
    clock: Arc<dyn Clock>,
}

impl CheckinService {
    pub fn new(
        stores: Stores,
        keys: AttendanceKeys,
        policy: RewardPolicy,
        rules: BonusRules,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = PointsLedger::new(stores.ledger);
        Self {
            attendance: AttendanceBook::new(stores.bits, keys),
            bonuses: BonusEngine::new(rules, ledger.clone()),
            ledger,
            validator: RetroValidator::new(policy.retro_quota),
            policy,
            clock,
        }
    }

    /// Build from configuration, validating the policy and bonus table.
    pub fn from_config(config: &Config, stores: Stores) -> Result<Self, ConfigError> {
        let rules = BonusRules::new(config.checkin.bonus_rules.clone())?;
        let policy = RewardPolicy::from_config(&config.checkin)?;
        let clock = SystemClock::from_offset_minutes(config.checkin.utc_offset_minutes)?;
        Ok(Self::new(
            stores,
            AttendanceKeys::new(config.storage.bits.key_prefix.clone()),
            policy,
            rules,
            Arc::new(clock),
        ))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    pub fn attendance(&self) -> &AttendanceBook {
        &self.attendance
    }

    /// Check in for today.
    pub async fn daily(&self, user_id: i64) -> Result<DailyCheckin, CheckinError> {
        let today = self.clock.today();
        let reference = daily_reference(today);

        let already_set = self.attendance.mark_daily(user_id, today).await?;

        let grant = if already_set {
            if self.ledger.has_reference(user_id, &reference).await? {
                None
            } else {
                warn!(user_id, date = %today, "daily bit set without a grant, retrying grant");
                self.grant_daily(user_id, &reference).await?
            }
        } else {
            let grant = self.grant_daily(user_id, &reference).await?;
            if grant.is_none() {
                warn!(user_id, date = %today, "daily grant already committed by a concurrent request");
            }
            grant
        };

        let Some(transaction) = grant else {
            let attendance = self.attendance.month(user_id, YearMonth::of(today)).await?;
            let summary = self.ledger.summary(user_id).await?;
            return Ok(DailyCheckin {
                date: today,
                status: DailyStatus::AlreadyCheckedIn,
                points_awarded: 0,
                balance: summary.points,
                consecutive_days: attendance.streak(),
                bonuses: BonusReport::default(),
            });
        };

        let status = if already_set {
            DailyStatus::Recovered
        } else {
            DailyStatus::CheckedIn
        };
        info!(user_id, date = %today, ?status, "daily check-in");

        let fallback = MonthAttendance::empty(YearMonth::of(today)).with_checked(today.day());
        let (attendance, bonuses) = self.settle_bonuses(user_id, fallback).await;

        Ok(DailyCheckin {
            date: today,
            status,
            points_awarded: transaction.delta,
            balance: bonuses.last_balance().unwrap_or(transaction.balance),
            consecutive_days: attendance.streak(),
            bonuses,
        })
    }

    async fn grant_daily(
        &self,
        user_id: i64,
        reference: &str,
    ) -> Result<Option<PointsTransaction>, CheckinError> {
        let grant = self
            .ledger
            .add_points(
                user_id,
                self.policy.daily_points,
                TransactionKind::Daily,
                DAILY_DESCRIPTION,
                reference,
            )
            .await?;
        Ok(match grant {
            Grant::Applied(transaction) => Some(transaction),
            Grant::Duplicate => None,
        })
    }

    /// Fill a missed day of the current month for the retro cost.
    ///
    /// Validation reads on the caller's task. Everything from setting the
    /// retro bit onward runs on a spawned task, so a dropped caller cannot
    /// leave the bit set without either a debit or its rollback.
    pub async fn retroactive(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<RetroCheckin, CheckinError> {
        let today = self.clock.today();
        let cost = self.policy.retro_cost;

        let snapshot = self
            .validator
            .validate(&self.attendance, user_id, date, today)
            .await?;

        let summary = self.ledger.summary(user_id).await?;
        if summary.points < cost {
            return Err(CheckinError::InsufficientBalance {
                balance: summary.points,
                required: cost,
            });
        }

        let service = self.clone();
        let fill = tokio::spawn(async move { service.fill_retro(user_id, date, snapshot).await });
        fill.await.map_err(StorageError::from)?
    }

    async fn fill_retro(
        &self,
        user_id: i64,
        date: NaiveDate,
        snapshot: MonthAttendance,
    ) -> Result<RetroCheckin, CheckinError> {
        let cost = self.policy.retro_cost;

        if self.attendance.mark_retro(user_id, date).await? {
            return Err(CheckinError::InvalidRetroDate {
                date,
                reason: RetroDateRejection::AlreadyFilled,
            });
        }

        let transaction = match self.commit_retro(user_id, date).await {
            Ok(transaction) => transaction,
            Err(cause) => return Err(self.roll_back_retro(user_id, date, cause).await),
        };
        info!(user_id, %date, cost, "retroactive check-in");

        let (attendance, bonuses) = self
            .settle_bonuses(user_id, snapshot.with_retro(date.day()))
            .await;

        let balance = match bonuses.last_balance().or(transaction.map(|t| t.balance)) {
            Some(balance) => balance,
            None => self.ledger.summary(user_id).await?.points,
        };

        Ok(RetroCheckin {
            date,
            cost,
            balance,
            consecutive_days: attendance.streak(),
            remaining_retro: self.validator.remaining(&attendance),
            bonuses,
        })
    }

    /// Steps that run with the retro bit set. Any error here is compensated.
    ///
    /// `None` means the debit for this date had already committed.
    async fn commit_retro(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<PointsTransaction>, CheckinError> {
        let month = self.attendance.month(user_id, YearMonth::of(date)).await?;
        let used = month.retro_used();
        if used > self.validator.quota() {
            return Err(CheckinError::RetroQuotaExceeded {
                used: used - 1,
                quota: self.validator.quota(),
            });
        }

        let cost = self.policy.retro_cost;
        let outcome = self
            .ledger
            .debit(
                user_id,
                cost,
                TransactionKind::Retroactive,
                format!("Retroactive check-in for {}", date),
                retro_reference(date),
            )
            .await?;

        match outcome {
            ApplyOutcome::Applied(transaction) => Ok(Some(transaction)),
            ApplyOutcome::Insufficient { balance } => Err(CheckinError::InsufficientBalance {
                balance,
                required: cost,
            }),
            ApplyOutcome::Duplicate => {
                warn!(user_id, %date, "retroactive debit already recorded, keeping fill");
                Ok(None)
            }
        }
    }

    async fn roll_back_retro(
        &self,
        user_id: i64,
        date: NaiveDate,
        cause: CheckinError,
    ) -> CheckinError {
        match self.attendance.unmark_retro(user_id, date).await {
            Ok(()) => {
                warn!(user_id, %date, error = %cause, "retroactive check-in rolled back");
                cause
            }
            Err(rollback) => {
                error!(
                    user_id,
                    %date,
                    error = %cause,
                    rollback_error = %rollback,
                    reconcile = true,
                    "retro bit set without a debit, rollback failed"
                );
                CheckinError::InconsistentState {
                    user_id,
                    date,
                    cause: Box::new(cause),
                    rollback,
                }
            }
        }
    }

    /// Re-read the month and grant due bonuses.
    ///
    /// The primary write has committed by now, so nothing here fails the
    /// request. If the month cannot be read, `fallback` (what this request
    /// knows to be set) stands in and the report is marked deferred.
    async fn settle_bonuses(
        &self,
        user_id: i64,
        fallback: MonthAttendance,
    ) -> (MonthAttendance, BonusReport) {
        let (attendance, read_error) = match self.attendance.month(user_id, fallback.month).await {
            Ok(attendance) => (attendance, None),
            Err(e) => {
                warn!(user_id, month = %fallback.month, error = %e, "month re-read failed");
                (fallback, Some(e.to_string()))
            }
        };

        let mut bonuses = self
            .bonuses
            .apply_due_bonuses(user_id, attendance.month, attendance.streak())
            .await;
        if bonuses.deferred.is_none() {
            bonuses.deferred = read_error;
        }
        (attendance, bonuses)
    }

    /// Month view. Read-only.
    pub async fn calendar(
        &self,
        user_id: i64,
        month: YearMonth,
    ) -> Result<MonthCalendar, CheckinError> {
        let today = self.clock.today();
        let attendance = self.attendance.month(user_id, month).await?;
        let checked_in_today = self.attendance.is_checked_in(user_id, today).await?;

        Ok(MonthCalendar {
            month,
            checked_in_days: attendance.checked_days(),
            retro_days: attendance.retro_days(),
            consecutive_days: attendance.streak(),
            remaining_retro: self.validator.remaining(&attendance),
            checked_in_today,
        })
    }

    pub async fn summary(&self, user_id: i64) -> Result<PointsSummary, CheckinError> {
        Ok(self.ledger.summary(user_id).await?)
    }

    pub async fn records(
        &self,
        user_id: i64,
        query: RecordsQuery,
    ) -> Result<RecordsPage, CheckinError> {
        Ok(self.ledger.records(user_id, query).await?)
    }
}
