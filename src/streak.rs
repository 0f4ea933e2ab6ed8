//! Streak arithmetic over month bitmaps.
//!
//! A month bitmap holds `day_count` bits with day 1 as the most significant
//! relevant bit, the shape a `get_bit_range` read returns.

/// Whether `day` (1-based) is set in a `day_count`-wide month bitmap.
pub fn is_day_set(bitmap: u64, day_count: u32, day: u32) -> bool {
    if day == 0 || day > day_count || day_count > 64 {
        return false;
    }
    (bitmap >> (day_count - day)) & 1 == 1
}

/// Longest run of consecutive set days, scanning day 1 to `day_count`.
///
/// Months are evaluated independently; there is no wraparound.
pub fn longest_run(bitmap: u64, day_count: u32) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    for day in 1..=day_count.min(64) {
        if is_day_set(bitmap, day_count, day) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Set days as 1-based day numbers, ascending.
pub fn bitmap_days(bitmap: u64, day_count: u32) -> Vec<u32> {
    (1..=day_count.min(64))
        .filter(|&day| is_day_set(bitmap, day_count, day))
        .collect()
}

/// Number of set days.
pub fn filled_count(bitmap: u64) -> u32 {
    bitmap.count_ones()
}
