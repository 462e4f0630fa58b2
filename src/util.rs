// Utility helpers for parsing, guarded arithmetic and formatting.
//
// This module centralizes all the "dirty" CSV/number/period handling so the
// rest of the code can assume clean, typed values. Every division in the crate
// goes through `safe_div` so no NaN or infinity escapes a computation.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
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

/// Parse a non-negative count. Missing, negative or unparsable values count as 0.
///
/// Exports written by dataframe tools often carry counts as `12.0`, so the
/// value goes through `parse_f64_safe` and is rounded. Values past `u64::MAX`
/// saturate.
pub fn parse_count(s: Option<&str>) -> u64 {
    match parse_f64_safe(s) {
        Some(v) if v >= 0.0 => v.round() as u64,
        _ => 0,
    }
}

/// Parse a money amount; missing or unparsable values become 0.
pub fn parse_money(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(0.0)
}

/// Parse a fiscal period code of the form `YYYYMM` into the first day of that month.
///
/// Returns `None` for anything that is not a whole six-digit code with a valid
/// month, so the caller can drop the row.
pub fn parse_period(s: Option<&str>) -> Option<NaiveDate> {
    let v = parse_f64_safe(s)?;
    if v.fract() != 0.0 || !(100_001.0..=999_912.0).contains(&v) {
        return None;
    }
    let code = v as i64;
    let year = (code / 100) as i32;
    let month = (code % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Trim an optional text field, mapping blank values to `None`.
pub fn clean_text(s: Option<String>) -> Option<String> {
    let s = s?.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Division that maps a zero (or non-finite) result to 0 instead of infinity/NaN.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Percent change from `base` to `value`; 0 when the base is 0.
pub fn pct_change(base: f64, value: f64) -> f64 {
    safe_div(value - base, base) * 100.0
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    safe_div(sum, v.len() as f64)
}

/// Min-max scale `value` into `[0, 1]`; 0 when the range is degenerate.
pub fn min_max_scale(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        safe_div(value - min, max - min)
    } else {
        0.0
    }
}

/// Render a percentage with an explicit sign and one decimal, e.g. `+12.5%`.
///
/// Small negative changes keep their sign, so `-0.01` renders as `-0.0%`.
pub fn format_signed_pct(pct: f64) -> String {
    format!("{:+.1}%", pct)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Month label used in column headers and previews, e.g. `Mar 2024`.
pub fn month_label(period: NaiveDate) -> String {
    period.format("%b %Y").to_string()
}
