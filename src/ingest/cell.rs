//! Cell-level normalization for loosely formatted spreadsheet exports.
//!
//! Brokerage and sheet exports disagree on almost everything: currency
//! symbols, thousands separators, percent signs, accounting-style negative
//! numbers, BOM artifacts, and header capitalization. Everything row-level
//! funnels through these helpers.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

const BOM: char = '\u{feff}';

/// Canonicalize a header cell: strip BOM, lowercase, collapse whitespace
/// runs to a single space, trim. Idempotent.
pub fn normalize_header(text: &str) -> String {
    let lowered = text.replace(BOM, "").to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a numeric cell into a Decimal.
///
/// Returns None for empty cells and for the "not a number" sentinels some
/// sheets use ("no purchase", "no", "n/a"). Parenthesis-wrapped values are
/// negated, the accounting convention for losses.
pub fn parse_number(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    if lowered.contains("no purchase") || lowered == "no" || lowered == "n/a" {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(*c, BOM | '$' | ',' | '%'))
        .collect();
    let cleaned = cleaned.trim();

    // Negate before dropping the parentheses, e.g. "(123.45)" -> -123.45.
    let (negated, cleaned) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, cleaned),
    };

    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(cleaned).ok()?;
    Some(if negated { -value } else { value })
}

/// Parse a date cell, tolerant of the formats the club's sources use.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim().trim_matches(BOM);
    if trimmed.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    None
}

fn month_number(mon: &str) -> Option<u32> {
    match mon.to_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

/// Extract an as-of date from an upload's filename.
///
/// Fidelity names exports like "Portfolio_Positions_Mar-29-2024.csv"; sheet
/// downloads tend toward ISO or US dashed dates. Patterns are tried in that
/// priority order.
pub fn parse_date_from_filename(name: &str) -> Option<NaiveDate> {
    static MONTH_NAME: OnceLock<Regex> = OnceLock::new();
    static ISO: OnceLock<Regex> = OnceLock::new();
    static US: OnceLock<Regex> = OnceLock::new();

    let month_name =
        MONTH_NAME.get_or_init(|| Regex::new(r"([A-Za-z]{3})-(\d{1,2})-(\d{4})").unwrap());
    if let Some(caps) = month_name.captures(name) {
        if let Some(month) = month_number(&caps[1]) {
            let day: u32 = caps[2].parse().ok()?;
            let year: i32 = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    let iso = ISO.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
    if let Some(caps) = iso.captures(name) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    let us = US.get_or_init(|| Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4})").unwrap());
    if let Some(caps) = us.captures(name) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}
