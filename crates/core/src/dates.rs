// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing date and amount formats.
//!
//! Clients write dates as `15.04.2026`, `15/04/2026`, `2026-04-15`, or
//! "15th of April 2026"; amounts use the Swiss thousands separator (`'`).
//! Events store `chosen_date` in DD.MM.YYYY; site visits store ISO dates.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn numeric_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[./](\d{1,2})[./](\d{2,4})\b").unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn verbose_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{4})\b",
        )
        .unwrap()
    })
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parse `DD.MM.YYYY` or `DD/MM/YYYY` (two-digit years resolve to 20xx).
pub fn parse_ddmmyyyy(s: &str) -> Option<NaiveDate> {
    let caps = numeric_date_re().captures(s.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an ISO `YYYY-MM-DD` date, tolerating a trailing time component.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    let caps = iso_date_re().captures(s.trim())?;
    NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
}

/// Parse any client-facing date format: numeric (DD.MM.YYYY, DD/MM/YYYY),
/// ISO, or verbose English ("15th of February 2026").
pub fn parse_client_date(s: &str) -> Option<NaiveDate> {
    if let Some(d) = parse_iso(s) {
        return Some(d);
    }
    if let Some(d) = parse_ddmmyyyy(s) {
        return Some(d);
    }
    let caps = verbose_date_re().captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(&caps[2]))? as u32 + 1;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Find all dates mentioned in free text (numeric formats first, then ISO,
/// then verbose English).
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut found = Vec::new();
    for caps in numeric_date_re().captures_iter(text) {
        if let Some(d) = parse_ddmmyyyy(&caps[0]) {
            found.push(d);
        }
    }
    for caps in iso_date_re().captures_iter(text) {
        if let Some(d) = parse_iso(&caps[0]) {
            found.push(d);
        }
    }
    for caps in verbose_date_re().captures_iter(text) {
        if let Some(d) = parse_client_date(&caps[0]) {
            found.push(d);
        }
    }
    found
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn day_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.?\b").unwrap())
}

/// Find a day.month mention without a year ("the 15.06."). Only meaningful
/// when [`find_dates`] found nothing; the pattern would otherwise match the
/// head of a full date.
pub fn find_day_month(text: &str) -> Option<(u32, u32)> {
    if !find_dates(text).is_empty() {
        return None;
    }
    let caps = day_month_re().captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    if (1..=31).contains(&day) && (1..=12).contains(&month) {
        Some((day, month))
    } else {
        None
    }
}

pub fn to_ddmmyyyy(date: NaiveDate) -> String {
    format!("{:02}.{:02}.{:04}", date.day(), date.month(), date.year())
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Convert an ISO date string to DD.MM.YYYY, passing through anything else.
pub fn iso_to_ddmmyyyy(s: &str) -> String {
    match parse_iso(s) {
        Some(d) => to_ddmmyyyy(d),
        None => s.to_string(),
    }
}

/// Parse a site-visit slot string to `(date_iso, time_slot)`.
///
/// Handles "2026-01-20 at 10:00", "20.01.2026 at 10:00", and bare dates.
pub fn parse_slot(slot: &str) -> (Option<String>, Option<String>) {
    let (date_part, time_slot) = match slot.split_once(" at ") {
        Some((d, t)) => (d.trim(), Some(t.trim().to_string())),
        None => (slot.trim(), None),
    };
    let date_iso = parse_client_date(date_part).map(to_iso);
    (date_iso, time_slot)
}

/// Format a CHF amount with the Swiss thousands separator: `CHF 1'234.50`.
pub fn format_chf(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\'');
        }
        grouped.push(c);
    }
    let sign = if negative { "-" } else { "" };
    format!("CHF {sign}{grouped}.{frac:02}")
}

/// Equivalent textual renderings of a date, used by fact verification to
/// accept alternate formats in generated prose.
pub fn date_aliases(date: NaiveDate) -> Vec<String> {
    let month_name = MONTHS.get(date.month0() as usize).copied().unwrap_or("");
    let mut capitalized = String::new();
    let mut chars = month_name.chars();
    if let Some(first) = chars.next() {
        capitalized.push(first.to_ascii_uppercase());
        capitalized.push_str(chars.as_str());
    }
    vec![
        to_ddmmyyyy(date),
        to_iso(date),
        format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year()),
        format!("{}{} of {} {}", date.day(), day_ordinal(date.day()), capitalized, date.year()),
        format!("{} {} {}", date.day(), capitalized, date.year()),
    ]
}

fn day_ordinal(day: u32) -> &'static str {
    match day % 10 {
        1 if day != 11 => "st",
        2 if day != 12 => "nd",
        3 if day != 13 => "rd",
        _ => "th",
    }
}

/// Resolve a day.month date without a year against a fallback year taken from
/// the message timestamp: if the date has already passed that year, roll over
/// to the next one.
pub fn resolve_day_month(day: u32, month: u32, fallback_year: i32, today: NaiveDate) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(fallback_year, month, day)?;
    if candidate < today {
        NaiveDate::from_ymd_opt(fallback_year + 1, month, day)
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
#[path = "dates_tests.rs"]
mod tests;
