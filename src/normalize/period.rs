// src/normalize/period.rs
//! Period decoding.
//!
//! Headers carry the covered month in one of two shapes: verbose
//! `"за январь 2024"` (often with a trailing "года" or other text around it)
//! and compact `"01.24"` (sometimes with footnote junk such as `*`). Both
//! decode to the last calendar day of that month. Anything else is rejected,
//! so a malformed header can never turn into a record with a guessed date.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static VERBOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)за\s+([а-яё]+)\s+(\d{4})").expect("verbose period regex"));

static COMPACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})\.(\d{2})$").expect("compact period regex"));

/// Month number for a Russian month name in its dictionary form.
pub fn month_number(name: &str) -> Option<u32> {
    let number = match name.to_lowercase().as_str() {
        "январь" => 1,
        "февраль" => 2,
        "март" => 3,
        "апрель" => 4,
        "май" => 5,
        "июнь" => 6,
        "июль" => 7,
        "август" => 8,
        "сентябрь" => 9,
        "октябрь" => 10,
        "ноябрь" => 11,
        "декабрь" => 12,
        _ => return None,
    };
    Some(number)
}

/// Last day of the month, leap-year aware.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|first| first.pred_opt())
}

/// Dec 31 of `year`, the period yearly rollups carry.
pub fn year_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// Decode a period token of either shape into the last day of the month it
/// covers. Compact tokens are stripped of everything but digits and dots
/// first; their two-digit years are anchored to 2000, which holds for as
/// long as the source publishes nothing older.
pub fn decode_period(token: &str) -> Option<NaiveDate> {
    if let Some(caps) = VERBOSE_RE.captures(token) {
        let month = month_number(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        return last_day_of_month(year, month);
    }

    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let caps = COMPACT_RE.captures(&cleaned)?;
    let month: u32 = caps[1].parse().ok()?;
    let year: i32 = 2000 + caps[2].parse::<i32>().ok()?;
    last_day_of_month(year, month)
}
