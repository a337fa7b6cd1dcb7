use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::debug;

// ── DateParser ────────────────────────────────────────────────────────────────

/// Parses billing dates from the variety of formats found in raw sources.
pub struct DateParser;

impl DateParser {
    const DATE_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%m/%d/%y",
        "%d-%b-%Y",
        "%Y%m%d",
    ];

    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%y %H:%M",
    ];

    /// Parse a calendar date, discarding any time of day.
    ///
    /// Returns `None` for blank or unrecognised input; the caller decides
    /// how to account for it. `%Y` accepts any number of digits, so a match
    /// is only kept when the year has four; two-digit years go through `%y`.
    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in Self::DATE_FORMATS {
            match NaiveDate::parse_from_str(s, fmt) {
                Ok(date) if has_four_digit_year(date) => return Some(date),
                _ => {}
            }
        }
        for fmt in Self::DATETIME_FORMATS {
            match NaiveDateTime::parse_from_str(s, fmt) {
                Ok(dt) if has_four_digit_year(dt.date()) => return Some(dt.date()),
                _ => {}
            }
        }

        debug!("DateParser: could not parse date \"{}\"", s);
        None
    }
}

fn has_four_digit_year(date: NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

// ── NumberParser ──────────────────────────────────────────────────────────────

/// Outcome of reading one numeric or boolean cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// A usable finite value.
    Value(f64),
    /// The cell was empty.
    Missing,
    /// The cell held text that could not be interpreted.
    Invalid,
}

impl Cell {
    /// The value with missing and invalid cells filled as `0.0`.
    pub fn or_zero(self) -> f64 {
        match self {
            Cell::Value(v) => v,
            Cell::Missing | Cell::Invalid => 0.0,
        }
    }
}

/// Parses numeric cells, rejecting NaN and infinities.
pub struct NumberParser;

impl NumberParser {
    pub fn parse(s: &str) -> Cell {
        let s = s.trim();
        if s.is_empty() {
            return Cell::Missing;
        }
        // Thousands separators show up in spreadsheet exports.
        let cleaned = s.replace(',', "");
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Value(v),
            _ => Cell::Invalid,
        }
    }
}

// ── BooleanParser ─────────────────────────────────────────────────────────────

/// Maps the textual flag encodings used by billing exports onto 0/1.
///
/// `X` and `On` mark a set flag, `Discon` and blank mark an unset one.
/// Numeric `0` and `1` are accepted so already-normalized data parses back
/// to itself; any other number is invalid.
pub struct BooleanParser;

impl BooleanParser {
    pub fn parse(s: &str) -> Cell {
        let s = s.trim();
        if s.is_empty() {
            return Cell::Missing;
        }
        match s.to_ascii_lowercase().as_str() {
            "x" | "on" | "true" | "yes" => Cell::Value(1.0),
            "discon" | "off" | "false" | "no" => Cell::Value(0.0),
            _ => match NumberParser::parse(s) {
                Cell::Value(v) if v == 0.0 || v == 1.0 => Cell::Value(v),
                _ => Cell::Invalid,
            },
        }
    }
}
