//! Check-in errors.

use std::fmt;

use chrono::NaiveDate;

use crate::interfaces::StorageError;

/// Why a retroactive date was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroDateRejection {
    /// The date is in another month than today.
    OutsideCurrentMonth,
    /// The date is today or later.
    NotInPast,
    /// The day is already checked in.
    AlreadyFilled,
}

impl fmt::Display for RetroDateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RetroDateRejection::OutsideCurrentMonth => "only days of the current month can be filled",
            RetroDateRejection::NotInPast => "only past days can be filled",
            RetroDateRejection::AlreadyFilled => "the day is already checked in",
        };
        f.write_str(reason)
    }
}

/// Errors returned by check-in operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckinError {
    #[error("Cannot fill {date}: {reason}")]
    InvalidRetroDate {
        date: NaiveDate,
        reason: RetroDateRejection,
    },

    #[error("Retroactive check-in quota exhausted: {used} of {quota} used this month")]
    RetroQuotaExceeded { used: u32, quota: u32 },

    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    /// Attendance was written but could not be rolled back after the ledger
    /// step failed. Needs operator reconciliation.
    #[error("Inconsistent state for user {user_id} on {date}: {cause}; rollback failed: {rollback}")]
    InconsistentState {
        user_id: i64,
        date: NaiveDate,
        cause: Box<CheckinError>,
        rollback: StorageError,
    },
}

impl CheckinError {
    /// Retroactive fills still available, for quota errors.
    pub fn remaining(&self) -> Option<u32> {
        match self {
            CheckinError::RetroQuotaExceeded { used, quota } => Some(quota.saturating_sub(*used)),
            _ => None,
        }
    }

    /// Points missing, for balance errors.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CheckinError::InsufficientBalance { balance, required } => {
                Some((required - balance).max(0))
            }
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckinError::StoreUnavailable(_))
    }

    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, CheckinError::InconsistentState { .. })
    }
}
