//! Date helpers plugins use to decide whether a menu applies.
//!
//! Weeks are ISO 8601 weeks; Monday is day 1.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::ApiError;

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidDate(value.to_string()))
}

pub fn week_of(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

pub fn week_is_even(date: NaiveDate) -> bool {
    week_of(date) % 2 == 0
}

pub fn week_is_odd(date: NaiveDate) -> bool {
    !week_is_even(date)
}

/// Same ISO week of the same ISO year.
pub fn is_same_week(date: NaiveDate, other: NaiveDate) -> bool {
    date.iso_week() == other.iso_week()
}

pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}

/// The date as scripts see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDate {
    pub iso: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// ISO weekday, Monday = 1.
    pub weekday: u32,
    /// ISO week number.
    pub week: u32,
}

impl From<NaiveDate> for PluginDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            iso: date.format("%Y-%m-%d").to_string(),
            year: date.year(),
            month: date.month(),
            day: date.day(),
            weekday: date.weekday().number_from_monday(),
            week: week_of(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2026-10-19").unwrap(), date(2026, 10, 19));
        assert_eq!(parse_date(" 2026-10-19 ").unwrap(), date(2026, 10, 19));
        assert!(matches!(parse_date("19/10/2026"), Err(ApiError::InvalidDate(_))));
    }

    #[test]
    fn week_parity() {
        // 2026-10-19 is the Monday of ISO week 43.
        assert_eq!(week_of(date(2026, 10, 19)), 43);
        assert!(week_is_odd(date(2026, 10, 19)));
        assert!(week_is_even(date(2026, 10, 26)));
    }

    #[test]
    fn iso_week_spans_year_boundary() {
        // 2027-01-01 is a Friday in ISO week 53 of 2026.
        assert_eq!(week_of(date(2027, 1, 1)), 53);
        assert!(is_same_week(date(2026, 12, 28), date(2027, 1, 1)));
        assert!(!is_same_week(date(2025, 10, 20), date(2026, 10, 19)));
    }

    #[test]
    fn weekdays() {
        assert!(is_weekday(date(2026, 10, 23)));
        assert!(!is_weekday(date(2026, 10, 24)));
        assert!(!is_weekday(date(2026, 10, 25)));
    }

    #[test]
    fn plugin_date_fields() {
        let view = PluginDate::from(date(2026, 10, 25));
        assert_eq!(view.iso, "2026-10-25");
        assert_eq!(view.weekday, 7);
        assert_eq!(view.week, 43);
        assert_eq!((view.year, view.month, view.day), (2026, 10, 25));
    }
}
