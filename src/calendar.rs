//! Calendar arithmetic for bitmap addressing.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// A calendar month of a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in the month.
    pub fn days(&self) -> u32 {
        match self.month {
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// 0-based day-of-year of the month's first day.
    pub fn first_day_offset(&self) -> u32 {
        (1..self.month)
            .map(|m| Self { year: self.year, month: m }.days())
            .sum()
    }

    /// `YYYYMM`, the bonus-log month key.
    pub fn compact(&self) -> String {
        format!("{}{:02}", self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid year-month '{0}': expected YYYY-MM")]
pub struct ParseYearMonthError(String);

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// 0-based bit offset of a date in its year bitmap.
pub fn year_offset(date: NaiveDate) -> u32 {
    date.ordinal0()
}

/// 0-based bit offset of a date in its month retro bitmap.
pub fn month_offset(date: NaiveDate) -> u32 {
    date.day0()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(YearMonth::new(2025, 1).unwrap().days(), 31);
        assert_eq!(YearMonth::new(2025, 2).unwrap().days(), 28);
        assert_eq!(YearMonth::new(2024, 2).unwrap().days(), 29);
        assert_eq!(YearMonth::new(1900, 2).unwrap().days(), 28);
        assert_eq!(YearMonth::new(2000, 2).unwrap().days(), 29);
        assert_eq!(YearMonth::new(2025, 4).unwrap().days(), 30);
        assert_eq!(YearMonth::new(2025, 12).unwrap().days(), 31);
    }

    #[test]
    fn test_first_day_offset_matches_chrono_ordinal() {
        for year in [2024, 2025] {
            for month in 1..=12 {
                let ym = YearMonth::new(year, month).unwrap();
                assert_eq!(ym.first_day_offset(), date(year, month, 1).ordinal0());
            }
        }
    }

    #[test]
    fn test_offsets() {
        assert_eq!(year_offset(date(2025, 1, 10)), 9);
        assert_eq!(month_offset(date(2025, 1, 8)), 7);
        assert_eq!(year_offset(date(2024, 12, 31)), 365);
    }

    #[test]
    fn test_new_rejects_invalid_month() {
        assert!(YearMonth::new(2025, 0).is_none());
        assert!(YearMonth::new(2025, 13).is_none());
    }

    #[test]
    fn test_parse_and_display() {
        let ym: YearMonth = "2025-03".parse().unwrap();
        assert_eq!(ym, YearMonth::new(2025, 3).unwrap());
        assert_eq!(ym.to_string(), "2025-03");
        assert_eq!(ym.compact(), "202503");

        assert!("2025-3".parse::<YearMonth>().is_err());
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("202503".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_contains() {
        let ym = YearMonth::new(2025, 1).unwrap();
        assert!(ym.contains(date(2025, 1, 31)));
        assert!(!ym.contains(date(2025, 2, 1)));
        assert!(!ym.contains(date(2024, 1, 15)));
    }
}
