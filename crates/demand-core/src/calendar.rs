use chrono::{Months, NaiveDate};

/// Format used for every date written by the pipeline.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Signed number of days from `start` to `end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `date` shifted back by `months` calendar months.
///
/// The day of month is clamped to the target month's length, so
/// 2023-03-31 minus one month is 2023-02-28. Returns `None` only when the
/// result falls outside chrono's supported range.
pub fn months_before(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(months))
}

/// `date` shifted back by `years` calendar years, clamped like
/// [`months_before`] (2024-02-29 minus one year is 2023-02-28).
pub fn years_before(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    months_before(date, years.saturating_mul(12))
}

/// Every day in `[start, end]`, ascending. Empty when `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
}

/// Render a date with [`DATE_FORMAT`].
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
