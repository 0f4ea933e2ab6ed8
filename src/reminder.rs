//! Missed check-in reminders.
//!
//! A user is worth reminding when they have not checked in today but did on
//! each of the previous `threshold` days. The look-back stays inside the
//! current year. Only reads.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::attendance::AttendanceBook;
use crate::clock::Clock;
use crate::interfaces::Result;

#[derive(Clone)]
pub struct ReminderSweep {
    attendance: AttendanceBook,
    clock: Arc<dyn Clock>,
}

impl ReminderSweep {
    pub fn new(attendance: AttendanceBook, clock: Arc<dyn Clock>) -> Self {
        Self { attendance, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn is_checked_in_today(&self, user_id: i64) -> Result<bool> {
        self.attendance
            .is_checked_in(user_id, self.clock.today())
            .await
    }

    pub async fn needs_reminder(&self, user_id: i64, threshold: u32) -> Result<bool> {
        let today = self.clock.today();
        if self.attendance.is_checked_in(user_id, today).await? {
            return Ok(false);
        }

        let previous = self.attendance.days_before(user_id, today, threshold).await?;
        Ok(previous.len() == threshold as usize && previous.iter().all(|b| *b))
    }

    /// Users among `user_ids` that need a reminder, in input order.
    ///
    /// A user whose attendance cannot be read is logged and skipped.
    pub async fn sweep(&self, user_ids: &[i64], threshold: u32) -> Vec<i64> {
        let mut due = Vec::new();
        for &user_id in user_ids {
            match self.needs_reminder(user_id, threshold).await {
                Ok(true) => due.push(user_id),
                Ok(false) => {}
                Err(e) => warn!(user_id, error = %e, "reminder check failed, skipping"),
            }
        }
        debug!(checked = user_ids.len(), due = due.len(), "reminder sweep");
        due
    }
}
