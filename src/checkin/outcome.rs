//! Results of check-in operations.

use chrono::NaiveDate;
use serde::Serialize;

use crate::bonus::BonusReport;
use crate::calendar::YearMonth;

/// How a daily check-in request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyStatus {
    /// First check-in of the day; points granted.
    CheckedIn,
    /// The day's bit was already set but its grant had never committed.
    /// This request committed it.
    Recovered,
    /// Nothing to do; no points granted.
    AlreadyCheckedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCheckin {
    pub date: NaiveDate,
    pub status: DailyStatus,
    pub points_awarded: i64,
    /// Balance after this request, including bonuses.
    pub balance: i64,
    pub consecutive_days: u32,
    pub bonuses: BonusReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetroCheckin {
    pub date: NaiveDate,
    pub cost: i64,
    pub balance: i64,
    pub consecutive_days: u32,
    pub remaining_retro: u32,
    pub bonuses: BonusReport,
}

/// Month view for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCalendar {
    pub month: YearMonth,
    pub checked_in_days: Vec<u32>,
    pub retro_days: Vec<u32>,
    pub consecutive_days: u32,
    pub remaining_retro: u32,
    pub checked_in_today: bool,
}
