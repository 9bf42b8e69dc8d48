// Utility helpers for value normalization, status vocabularies, dates and
// number formatting.
//
// This module centralizes all the "dirty" cell handling so the rest of the
// code can work with trimmed strings and typed dates.
use crate::types::CellValue;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

const PAID_VALUES: [&str; 4] = ["paid", "success", "completed", "yes"];
const SUBMITTED_VALUES: [&str; 4] = ["submitted", "yes", "complete", "completed"];

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01.
pub const EXCEL_UNIX_EPOCH_OFFSET: f64 = 25569.0;

/// Trim and case-fold a cell value. Missing values normalize to `""`.
pub fn normalize_value(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Anything outside the paid vocabulary, including blanks, counts as unpaid.
pub fn is_paid(value: &str) -> bool {
    PAID_VALUES.contains(&normalize_value(value).as_str())
}

/// Anything outside the submitted vocabulary, including blanks, counts as pending.
pub fn is_submitted(value: &str) -> bool {
    SUBMITTED_VALUES.contains(&normalize_value(value).as_str())
}

/// Empty or "unknown" labels are left out of distinct counts and groupings.
pub fn is_unknown_label(value: &str) -> bool {
    let n = normalize_value(value);
    n.is_empty() || n == "unknown"
}

/// District cells that do not name a real district.
pub fn is_placeholder_district(value: &str) -> bool {
    matches!(
        normalize_value(value).as_str(),
        "" | "general" | "others" | "unknown"
    )
}

/// Parse a string-like value into `f64`, forgiving thousands separators.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert a spreadsheet date serial into a timestamp.
///
/// The serial is shifted to the Unix epoch and converted to seconds.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let secs = ((serial - EXCEL_UNIX_EPOCH_OFFSET) * 86_400.0).round();
    if secs.abs() > 1e13 {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc())
}

static DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})$").expect("valid d/m/y pattern")
});

const GENERIC_DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const GENERIC_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Best-effort birth date extraction from a cell.
///
/// Tried in order: native date, numeric serial, `d/m/y` text (two-digit
/// years are taken as 20xx), then a handful of generic layouts.
pub fn parse_birth_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Number(n) => excel_serial_to_datetime(*n).map(|dt| dt.date()),
        CellValue::Text(s) => parse_date_text(s.trim()),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Some(serial) = parse_f64_safe(Some(s)).filter(|_| !s.contains(['/', '-'])) {
        return excel_serial_to_datetime(serial).map(|dt| dt.date());
    }
    if let Some(caps) = DMY.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if caps[3].len() == 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok().map(|dt| dt.date()))
        .or_else(|| {
            GENERIC_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        })
}

/// Whole years between `born` and `today`, minus one if the birthday has
/// not come around yet this year.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

/// Map an age onto one of the fixed buckets.
pub fn age_bucket(age: Option<i32>) -> &'static str {
    match age {
        Some(a) if (10..22).contains(&a) => "15-22",
        Some(a) if (22..30).contains(&a) => "22-30",
        Some(a) if (30..40).contains(&a) => "30-40",
        Some(a) if (40..=45).contains(&a) => "40-45",
        _ => "Unknown",
    }
}

/// Resolve a `num-format` locale by name, falling back to `en`.
pub fn locale_or_default(name: &str) -> Locale {
    Locale::from_name(name).unwrap_or_else(|_| {
        log::warn!("unknown locale '{}', using en", name);
        Locale::en
    })
}

pub fn format_int<T>(n: T, locale: &Locale) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(locale)
}
