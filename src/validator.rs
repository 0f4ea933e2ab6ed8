//! Retroactive check-in rules.
//!
//! A fill is allowed for a past day of the current month that is not yet
//! attended, while the month's retro quota lasts. Every check here reads;
//! nothing writes.

use chrono::{Datelike, NaiveDate};

use crate::attendance::{AttendanceBook, MonthAttendance};
use crate::calendar::YearMonth;
use crate::error::{CheckinError, RetroDateRejection};

/// Validates retroactive check-in requests.
#[derive(Debug, Clone, Copy)]
pub struct RetroValidator {
    quota: u32,
}

impl RetroValidator {
    pub fn new(quota: u32) -> Self {
        Self { quota }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Date-only rules.
    pub fn check_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), CheckinError> {
        if YearMonth::of(date) != YearMonth::of(today) {
            return Err(CheckinError::InvalidRetroDate {
                date,
                reason: RetroDateRejection::OutsideCurrentMonth,
            });
        }
        if date >= today {
            return Err(CheckinError::InvalidRetroDate {
                date,
                reason: RetroDateRejection::NotInPast,
            });
        }
        Ok(())
    }

    /// Attendance rules against a snapshot of `date`'s month.
    pub fn check_month(
        &self,
        attendance: &MonthAttendance,
        date: NaiveDate,
    ) -> Result<(), CheckinError> {
        if attendance.is_filled(date.day()) {
            return Err(CheckinError::InvalidRetroDate {
                date,
                reason: RetroDateRejection::AlreadyFilled,
            });
        }
        self.check_quota(attendance.retro_used())
    }

    pub fn check_quota(&self, used: u32) -> Result<(), CheckinError> {
        if used >= self.quota {
            return Err(CheckinError::RetroQuotaExceeded {
                used,
                quota: self.quota,
            });
        }
        Ok(())
    }

    /// Run every rule, returning the month snapshot that was read.
    pub async fn validate(
        &self,
        book: &AttendanceBook,
        user_id: i64,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<MonthAttendance, CheckinError> {
        self.check_date(date, today)?;
        let attendance = book.month(user_id, YearMonth::of(date)).await?;
        self.check_month(&attendance, date)?;
        Ok(attendance)
    }

    pub fn remaining(&self, attendance: &MonthAttendance) -> u32 {
        self.quota.saturating_sub(attendance.retro_used())
    }
}
