//! Shared traits and calendar utilities for finance primitives.

use chrono::{Datelike, NaiveDate};

/// Text format used for date columns in persisted rows.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Parses a `YYYY-MM-DD` column value, tolerating surrounding whitespace.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Number of days in `month` of `year`, or `None` when the year is outside chrono's range.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    first_next.pred_opt().map(|last| last.day())
}

/// Moves `date` forward by `months` calendar months and lands on `day`, clamped to
/// the last valid day of the resulting month.
pub fn shift_month(date: NaiveDate, months: u32, day: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + i32::try_from(months).ok()?;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = day.clamp(1, days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Moves `date` forward by `years`, keeping its month and clamping `day` the same
/// way [`shift_month`] does (Feb 29 lands on Feb 28 in common years).
pub fn shift_year(date: NaiveDate, years: u32, day: u32) -> Option<NaiveDate> {
    shift_month(date, years.checked_mul(12)?, day)
}
