//! Sunflower check-in - attendance bitmaps and reward ledger
//!
//! Users check in once per day, may fill up to three missed days of the
//! current month for a point cost, and earn streak bonuses. Attendance lives
//! in a compact bit store, points live in a transactional ledger; the
//! [`checkin::CheckinService`] keeps the two consistent.

pub mod attendance;
pub mod bonus;
pub mod calendar;
pub mod checkin;
pub mod clock;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod ledger;
pub mod reminder;
pub mod storage;
pub mod streak;
pub mod utils;
pub mod validator;

pub use checkin::CheckinService;
pub use error::CheckinError;
