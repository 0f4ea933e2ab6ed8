//! checkin-reminder: one-shot missed check-in sweep
//!
//! Reads attendance for the configured users and prints, one per line, the
//! ids of users who checked in on each of the previous `threshold` days but
//! not yet today. A scheduler runs it and feeds the output to a notifier.
//!
//! ## Configuration
//! - CHECKIN_CONFIG: Path to a YAML config file (optional; also first argument)
//! - CHECKIN__REMINDER__THRESHOLD: Days of history required (default: 2)
//! - CHECKIN_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::info;

use sunflower_checkin::attendance::{AttendanceBook, AttendanceKeys};
use sunflower_checkin::clock::SystemClock;
use sunflower_checkin::config::Config;
use sunflower_checkin::reminder::ReminderSweep;
use sunflower_checkin::storage::init_storage;
use sunflower_checkin::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;

    let stores = init_storage(&config.storage).await?;
    let clock = SystemClock::from_offset_minutes(config.checkin.utc_offset_minutes)?;
    let book = AttendanceBook::new(
        stores.bits,
        AttendanceKeys::new(config.storage.bits.key_prefix.clone()),
    );
    let sweep = ReminderSweep::new(book, Arc::new(clock));

    let threshold = config.reminder.threshold;
    info!(
        date = %sweep.today(),
        users = config.reminder.user_ids.len(),
        threshold,
        "checkin-reminder started"
    );

    let due = sweep.sweep(&config.reminder.user_ids, threshold).await;
    for user_id in &due {
        println!("{}", user_id);
    }

    info!(due = due.len(), "checkin-reminder finished");
    Ok(())
}
