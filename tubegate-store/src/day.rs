//! Quota day computation.
//!
//! Providers reset daily budgets at a fixed wall-clock time rather than at
//! local midnight. An instant belongs to the calendar date of its local time
//! in the reference offset, moved back one day when that local time is
//! strictly before the reset boundary.

use chrono::{DateTime, NaiveDate, Utc};
use tubegate_core::DayBoundary;

/// Format of day strings.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// The quota day `now` belongs to.
pub fn day_date(now: DateTime<Utc>, boundary: &DayBoundary) -> NaiveDate {
    let local = now.with_timezone(&boundary.offset());
    let date = local.date_naive();
    if local.time() < boundary.time() {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// The quota day `now` belongs to, as `YYYY-MM-DD`.
pub fn day_string(now: DateTime<Utc>, boundary: &DayBoundary) -> String {
    day_date(now, boundary).format(DAY_FORMAT).to_string()
}

/// Parses a day string back into a date.
pub fn parse_day(day: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(day, DAY_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_before_boundary_is_previous_day() {
        // 15:59:59 KST on 2025-03-10
        let now = utc(2025, 3, 10, 6, 59, 59);
        assert_eq!(day_string(now, &DayBoundary::default()), "2025-03-09");
    }

    #[test]
    fn test_at_boundary_is_same_day() {
        // 16:00:00 KST on 2025-03-10
        let now = utc(2025, 3, 10, 7, 0, 0);
        assert_eq!(day_string(now, &DayBoundary::default()), "2025-03-10");
    }

    #[test]
    fn test_after_boundary_is_same_day() {
        // 23:30 KST on 2025-03-10
        let now = utc(2025, 3, 10, 14, 30, 0);
        assert_eq!(day_string(now, &DayBoundary::default()), "2025-03-10");
    }

    #[test]
    fn test_offset_moves_the_calendar_date() {
        // 01:00 KST on 2025-03-11 is still before 16:00, so 2025-03-10
        let now = utc(2025, 3, 10, 16, 0, 0);
        assert_eq!(day_string(now, &DayBoundary::default()), "2025-03-10");

        // Same instant with a UTC midnight boundary
        let midnight_utc = DayBoundary::new(0, 0, 0);
        assert_eq!(day_string(now, &midnight_utc), "2025-03-10");

        // Negative offsets
        let eastern = DayBoundary::new(0, 0, -300);
        assert_eq!(day_string(utc(2025, 3, 10, 3, 0, 0), &eastern), "2025-03-09");
    }

    #[test]
    fn test_boundary_minute() {
        let boundary = DayBoundary::new(16, 30, 540);
        assert_eq!(day_string(utc(2025, 3, 10, 7, 29, 0), &boundary), "2025-03-09");
        assert_eq!(day_string(utc(2025, 3, 10, 7, 30, 0), &boundary), "2025-03-10");
    }

    #[test]
    fn test_year_rollover() {
        // 09:00 KST on 2025-01-01
        assert_eq!(
            day_string(utc(2025, 1, 1, 0, 0, 0), &DayBoundary::default()),
            "2024-12-31"
        );
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2025-03-10"), NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(parse_day("yesterday"), None);
    }
}
