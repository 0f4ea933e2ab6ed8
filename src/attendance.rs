//! Attendance bitmaps.
//!
//! Two bitmaps per user: a year bitmap with one bit per day of year for
//! same-day check-ins, and a month bitmap with one bit per day of month for
//! retroactive fills. A month view ORs the year bitmap's slice for that
//! month with the month's retro bitmap.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{month_offset, year_offset, YearMonth};
use crate::interfaces::{BitStore, Result};
use crate::streak;

/// Physical key layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceKeys {
    prefix: String,
}

impl AttendanceKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `{prefix}:checkins:daily:{user}:{year}`
    pub fn year_key(&self, user_id: i64, year: i32) -> String {
        format!("{}:checkins:daily:{}:{}", self.prefix, user_id, year)
    }

    /// `{prefix}:checkins:retro:{user}:{year}:{MM}`
    pub fn retro_key(&self, user_id: i64, month: YearMonth) -> String {
        format!(
            "{}:checkins:retro:{}:{}:{:02}",
            self.prefix,
            user_id,
            month.year(),
            month.month()
        )
    }
}

/// Snapshot of one user's month.
///
/// Both bitmaps are `month.days()` wide with day 1 as the most significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthAttendance {
    pub month: YearMonth,
    /// Same-day check-ins.
    pub checked: u64,
    /// Retroactive fills.
    pub retro: u64,
}

impl MonthAttendance {
    pub fn empty(month: YearMonth) -> Self {
        Self {
            month,
            checked: 0,
            retro: 0,
        }
    }

    pub fn merged(&self) -> u64 {
        self.checked | self.retro
    }

    /// Longest run of attended days in the month.
    pub fn streak(&self) -> u32 {
        streak::longest_run(self.merged(), self.month.days())
    }

    /// Whether `day` (1-based) is attended either way.
    pub fn is_filled(&self, day: u32) -> bool {
        streak::is_day_set(self.merged(), self.month.days(), day)
    }

    pub fn retro_used(&self) -> u32 {
        streak::filled_count(self.retro)
    }

    pub fn checked_days(&self) -> Vec<u32> {
        streak::bitmap_days(self.checked, self.month.days())
    }

    pub fn retro_days(&self) -> Vec<u32> {
        streak::bitmap_days(self.retro, self.month.days())
    }

    /// Same snapshot with `day` marked as a same-day check-in.
    pub fn with_checked(mut self, day: u32) -> Self {
        self.checked |= self.day_mask(day);
        self
    }

    /// Same snapshot with `day` marked as a retroactive fill.
    pub fn with_retro(mut self, day: u32) -> Self {
        self.retro |= self.day_mask(day);
        self
    }

    fn day_mask(&self, day: u32) -> u64 {
        let days = self.month.days();
        if (1..=days).contains(&day) {
            1 << (days - day)
        } else {
            0
        }
    }
}

/// Reads and writes attendance through a [`BitStore`].
#[derive(Clone)]
pub struct AttendanceBook {
    store: Arc<dyn BitStore>,
    keys: AttendanceKeys,
}

impl AttendanceBook {
    pub fn new(store: Arc<dyn BitStore>, keys: AttendanceKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &AttendanceKeys {
        &self.keys
    }

    /// Read both bitmaps for a month. Missing keys read as empty.
    pub async fn month(&self, user_id: i64, month: YearMonth) -> Result<MonthAttendance> {
        let days = month.days();
        let checked = self
            .store
            .get_bit_range(
                &self.keys.year_key(user_id, month.year()),
                days,
                month.first_day_offset(),
            )
            .await?;
        let retro = self
            .store
            .get_bit_range(&self.keys.retro_key(user_id, month), days, 0)
            .await?;
        Ok(MonthAttendance {
            month,
            checked,
            retro,
        })
    }

    /// Set the same-day bit for `date`. Returns the previous value.
    pub async fn mark_daily(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let key = self.keys.year_key(user_id, date.year());
        let offset = year_offset(date);
        let previous = self.store.set_bit(&key, offset).await?;
        debug!(user_id, %date, offset, previous, "daily bit set");
        Ok(previous)
    }

    pub async fn is_checked_in(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let key = self.keys.year_key(user_id, date.year());
        self.store.get_bit(&key, year_offset(date)).await
    }

    /// Set the retro bit for `date`. Returns the previous value.
    pub async fn mark_retro(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let key = self.keys.retro_key(user_id, YearMonth::of(date));
        let offset = month_offset(date);
        let previous = self.store.set_bit(&key, offset).await?;
        debug!(user_id, %date, offset, previous, "retro bit set");
        Ok(previous)
    }

    /// Clear the retro bit for `date`. Compensation only.
    pub async fn unmark_retro(&self, user_id: i64, date: NaiveDate) -> Result<()> {
        let key = self.keys.retro_key(user_id, YearMonth::of(date));
        self.store.clear_bit(&key, month_offset(date)).await?;
        debug!(user_id, %date, "retro bit cleared");
        Ok(())
    }

    /// Same-day bits for the `days` days ending the day before `date`,
    /// clipped at January 1st. Oldest day first; empty when `date` is the
    /// first day of the year.
    pub async fn days_before(&self, user_id: i64, date: NaiveDate, days: u32) -> Result<Vec<bool>> {
        let end = year_offset(date);
        let width = days.min(end);
        if width == 0 {
            return Ok(Vec::new());
        }

        let key = self.keys.year_key(user_id, date.year());
        let mut bits = Vec::with_capacity(width as usize);
        let mut start = end - width;
        while start < end {
            let chunk = (end - start).min(crate::interfaces::MAX_RANGE_WIDTH);
            let value = self.store.get_bit_range(&key, chunk, start).await?;
            bits.extend((1..=chunk).map(|day| streak::is_day_set(value, chunk, day)));
            start += chunk;
        }
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryBitStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book() -> (AttendanceBook, Arc<MemoryBitStore>) {
        let store = Arc::new(MemoryBitStore::new());
        (AttendanceBook::new(store.clone(), AttendanceKeys::new("test")), store)
    }

    #[test]
    fn test_key_layout() {
        let keys = AttendanceKeys::new("sunflower");
        let month = YearMonth::new(2025, 3).unwrap();
        assert_eq!(keys.year_key(42, 2025), "sunflower:checkins:daily:42:2025");
        assert_eq!(keys.retro_key(42, month), "sunflower:checkins:retro:42:2025:03");
    }

    #[test]
    fn test_month_snapshot_views() {
        let month = YearMonth::new(2025, 1).unwrap();
        let snapshot = MonthAttendance {
            month,
            checked: 0b111 << (31 - 3),
            retro: 0,
        }
        .with_retro(5);

        assert_eq!(snapshot.checked_days(), vec![1, 2, 3]);
        assert_eq!(snapshot.retro_days(), vec![5]);
        assert!(snapshot.is_filled(5));
        assert!(!snapshot.is_filled(4));
        assert_eq!(snapshot.streak(), 3);
        assert_eq!(snapshot.retro_used(), 1);
    }

    #[tokio::test]
    async fn test_daily_bit_lands_in_month_slice() {
        let (book, _) = book();
        assert!(!book.mark_daily(1, date(2025, 1, 10)).await.unwrap());
        assert!(book.mark_daily(1, date(2025, 1, 10)).await.unwrap());
        book.mark_daily(1, date(2025, 2, 1)).await.unwrap();

        let january = book.month(1, YearMonth::new(2025, 1).unwrap()).await.unwrap();
        assert_eq!(january.checked_days(), vec![10]);

        let february = book.month(1, YearMonth::new(2025, 2).unwrap()).await.unwrap();
        assert_eq!(february.checked_days(), vec![1]);
        assert!(book.is_checked_in(1, date(2025, 2, 1)).await.unwrap());
        assert!(!book.is_checked_in(1, date(2025, 2, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_leap_year_month_offsets() {
        let (book, _) = book();
        book.mark_daily(1, date(2024, 3, 1)).await.unwrap();

        let february = book.month(1, YearMonth::new(2024, 2).unwrap()).await.unwrap();
        assert!(february.checked_days().is_empty());
        let march = book.month(1, YearMonth::new(2024, 3).unwrap()).await.unwrap();
        assert_eq!(march.checked_days(), vec![1]);
    }

    #[tokio::test]
    async fn test_retro_mark_and_unmark() {
        let (book, store) = book();
        let month = YearMonth::new(2025, 1).unwrap();

        assert!(!book.mark_retro(1, date(2025, 1, 8)).await.unwrap());
        assert_eq!(book.month(1, month).await.unwrap().retro_days(), vec![8]);

        book.unmark_retro(1, date(2025, 1, 8)).await.unwrap();
        assert_eq!(store.count_ones(&book.keys().retro_key(1, month)).await, 0);
    }

    #[tokio::test]
    async fn test_days_before_clips_at_year_start() {
        let (book, _) = book();
        book.mark_daily(1, date(2025, 1, 1)).await.unwrap();
        book.mark_daily(1, date(2025, 1, 2)).await.unwrap();

        assert!(book.days_before(1, date(2025, 1, 1), 2).await.unwrap().is_empty());
        assert_eq!(book.days_before(1, date(2025, 1, 2), 2).await.unwrap(), vec![true]);
        assert_eq!(
            book.days_before(1, date(2025, 1, 4), 3).await.unwrap(),
            vec![true, true, false]
        );
    }

    #[tokio::test]
    async fn test_days_before_spans_chunks() {
        let (book, _) = book();
        let today = date(2025, 6, 1);
        let mut day = date(2025, 1, 1);
        while day < today {
            book.mark_daily(1, day).await.unwrap();
            day = day.succ_opt().unwrap();
        }

        let bits = book.days_before(1, today, 100).await.unwrap();
        assert_eq!(bits.len(), 100);
        assert!(bits.iter().all(|b| *b));
    }
}
