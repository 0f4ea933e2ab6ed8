//! Reward policy and reminder configuration.

use serde::Deserialize;

use crate::bonus::{BonusRule, BonusRules};

/// Points awarded for a same-day check-in.
pub const DEFAULT_DAILY_POINTS: i64 = 1;
/// Points debited for one retroactive check-in.
pub const DEFAULT_RETRO_COST: i64 = 100;
/// Retroactive check-ins allowed per calendar month.
pub const DEFAULT_RETRO_QUOTA: u32 = 3;
/// Consecutive prior days that make a missing check-in worth a reminder.
pub const DEFAULT_REMINDER_THRESHOLD: u32 = 2;

/// Reward policy for check-ins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    pub daily_points: i64,
    pub retro_cost: i64,
    pub retro_quota: u32,
    /// Offset from UTC, in minutes, of the calendar that defines "today".
    pub utc_offset_minutes: i32,
    /// Streak bonus table. Validated when the service is built.
    pub bonus_rules: Vec<BonusRule>,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            daily_points: DEFAULT_DAILY_POINTS,
            retro_cost: DEFAULT_RETRO_COST,
            retro_quota: DEFAULT_RETRO_QUOTA,
            utc_offset_minutes: 0,
            bonus_rules: BonusRules::standard().to_vec(),
        }
    }
}

/// Missed check-in reminder sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub threshold: u32,
    /// Users to sweep.
    pub user_ids: Vec<i64>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REMINDER_THRESHOLD,
            user_ids: Vec::new(),
        }
    }
}
