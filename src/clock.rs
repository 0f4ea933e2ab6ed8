//! Calendar clock.
//!
//! "Today" is a calendar date in one configured time zone, not a UTC
//! instant. Injecting the clock keeps date-bound rules testable.

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{Datelike, FixedOffset, NaiveDate, Offset, Utc};

use crate::config::ConfigError;

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock read in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Build from a signed offset in minutes east of UTC.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ConfigError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
            .ok_or(ConfigError::InvalidUtcOffset(minutes))
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock pinned to a settable date.
#[derive(Debug)]
pub struct FixedClock {
    days_from_ce: AtomicI32,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(date.num_days_from_ce()),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        self.days_from_ce
            .store(date.num_days_from_ce(), Ordering::SeqCst);
    }

    /// Move forward one day.
    pub fn advance(&self) {
        self.days_from_ce.fetch_add(1, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        clock.advance();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());

        clock.set(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_offset_bounds() {
        assert!(SystemClock::from_offset_minutes(480).is_ok());
        assert!(SystemClock::from_offset_minutes(-720).is_ok());
        assert!(matches!(
            SystemClock::from_offset_minutes(24 * 60),
            Err(ConfigError::InvalidUtcOffset(1440))
        ));
    }

    #[test]
    fn test_offset_changes_date_near_midnight() {
        let east = SystemClock::from_offset_minutes(14 * 60).unwrap();
        let west = SystemClock::from_offset_minutes(-12 * 60).unwrap();
        let delta = east.today() - west.today();
        assert!(delta.num_days() >= 1);
    }
}
