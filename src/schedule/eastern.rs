//! US Eastern wall-clock helpers.
//!
//! "Today" for the schedule is the Eastern calendar day. DST runs from 02:00
//! local on the second Sunday of March to 02:00 local on the first Sunday of
//! November.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};

const EST_OFFSET_HOURS: i64 = -5;
const EDT_OFFSET_HOURS: i64 = -4;

fn dst_start_utc(year: i32) -> Option<DateTime<Utc>> {
    // 02:00 EST == 07:00 UTC
    NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)?
        .and_hms_opt(7, 0, 0)
        .map(|dt| dt.and_utc())
}

fn dst_end_utc(year: i32) -> Option<DateTime<Utc>> {
    // 02:00 EDT == 06:00 UTC
    NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)?
        .and_hms_opt(6, 0, 0)
        .map(|dt| dt.and_utc())
}

pub fn is_dst(instant: DateTime<Utc>) -> bool {
    match (dst_start_utc(instant.year()), dst_end_utc(instant.year())) {
        (Some(start), Some(end)) => instant >= start && instant < end,
        _ => false,
    }
}

/// Eastern local time for a UTC instant.
pub fn to_local(instant: DateTime<Utc>) -> NaiveDateTime {
    let hours = if is_dst(instant) {
        EDT_OFFSET_HOURS
    } else {
        EST_OFFSET_HOURS
    };
    instant.naive_utc() + Duration::hours(hours)
}

/// The Eastern calendar date at `now`.
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    to_local(now).date()
}

/// "7:05 PM ET"
pub fn format_game_time(instant: DateTime<Utc>) -> String {
    to_local(instant).format("%-I:%M %p ET").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dst_boundaries_2024() {
        // DST began 2024-03-10 07:00 UTC and ended 2024-11-03 06:00 UTC
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 6, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert!(!is_dst(before));
        assert!(is_dst(after));

        let last = Utc.with_ymd_and_hms(2024, 11, 3, 5, 59, 0).unwrap();
        let over = Utc.with_ymd_and_hms(2024, 11, 3, 6, 0, 0).unwrap();
        assert!(is_dst(last));
        assert!(!is_dst(over));
    }

    #[test]
    fn test_today_rolls_back_late_utc() {
        // 02:30 UTC on Jul 5 is still Jul 4 in New York
        let now = Utc.with_ymd_and_hms(2024, 7, 5, 2, 30, 0).unwrap();
        assert_eq!(today(now), NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
    }

    #[test]
    fn test_format_game_time() {
        let summer = Utc.with_ymd_and_hms(2024, 7, 4, 17, 5, 0).unwrap();
        assert_eq!(format_game_time(summer), "1:05 PM ET");
        let spring = Utc.with_ymd_and_hms(2024, 3, 1, 0, 10, 0).unwrap();
        assert_eq!(format_game_time(spring), "7:10 PM ET");
    }
}
