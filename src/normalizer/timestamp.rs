//! Multi-epoch timestamp decoding.
//!
//! Every timestamp that reaches an artifact goes through
//! [`normalize_timestamp`], which always yields UTC ISO-8601 with an explicit
//! `+00:00` offset or nothing at all.

use std::time::SystemTime;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::constants::{CHROME_EPOCH_OFFSET_SECS, COCOA_EPOCH_OFFSET_SECS};

/// A timestamp as found in source data, before decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawTimestamp<'a> {
    Text(&'a str),
    Number(f64),
    Instant(DateTime<Utc>),
}

impl<'a> From<&'a str> for RawTimestamp<'a> {
    fn from(value: &'a str) -> Self {
        RawTimestamp::Text(value)
    }
}

impl<'a> From<&'a String> for RawTimestamp<'a> {
    fn from(value: &'a String) -> Self {
        RawTimestamp::Text(value.as_str())
    }
}

impl From<f64> for RawTimestamp<'_> {
    fn from(value: f64) -> Self {
        RawTimestamp::Number(value)
    }
}

impl From<i64> for RawTimestamp<'_> {
    fn from(value: i64) -> Self {
        RawTimestamp::Number(value as f64)
    }
}

impl From<u64> for RawTimestamp<'_> {
    fn from(value: u64) -> Self {
        RawTimestamp::Number(value as f64)
    }
}

impl From<DateTime<Utc>> for RawTimestamp<'_> {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Instant(value)
    }
}

impl From<SystemTime> for RawTimestamp<'_> {
    fn from(value: SystemTime) -> Self {
        RawTimestamp::Instant(DateTime::<Utc>::from(value))
    }
}

impl<'a> RawTimestamp<'a> {
    /// Interpret a JSON value as a timestamp candidate.
    ///
    /// Only strings and numbers qualify; everything else is `None`.
    pub fn from_json(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RawTimestamp::Text(s.as_str())),
            Value::Number(n) => n.as_f64().map(RawTimestamp::Number),
            _ => None,
        }
    }
}

/// Normalize a timestamp in any supported encoding to UTC ISO-8601.
///
/// Numbers are classified by magnitude:
///
/// | magnitude | scheme                              |
/// |-----------|-------------------------------------|
/// | > 1e16    | microseconds since 1601-01-01       |
/// | > 1e12    | milliseconds since 1970-01-01       |
/// | > 1e9     | seconds since 1970-01-01            |
/// | > 1e8     | seconds since 2001-01-01 (Cocoa)    |
///
/// Anything else, including negative, zero or unparseable input, yields
/// `None`, as does any instant outside years 1..=9999, whose text form would
/// not sort chronologically. This function never panics.
///
/// # Example
///
/// ```
/// use ai_trace_collector::normalizer::normalize_timestamp;
///
/// assert_eq!(
///     normalize_timestamp(1704067200_i64).as_deref(),
///     Some("2024-01-01T00:00:00+00:00")
/// );
/// assert_eq!(normalize_timestamp("not a date"), None);
/// ```
pub fn normalize_timestamp<'a>(value: impl Into<RawTimestamp<'a>>) -> Option<String> {
    match value.into() {
        RawTimestamp::Instant(dt) => four_digit_year(dt).map(format_utc),
        RawTimestamp::Number(n) => decode_epoch(n).map(format_utc),
        RawTimestamp::Text(text) => decode_text(text).map(format_utc),
    }
}

/// Normalize a JSON value, returning `None` for non-scalar values.
pub fn normalize_json_timestamp(value: &Value) -> Option<String> {
    RawTimestamp::from_json(value).and_then(normalize_timestamp)
}

/// Parse an already-normalized (or any ISO-8601) string back into an instant.
pub fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    decode_iso(text.trim())
}

fn four_digit_year(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (1..=9999).contains(&dt.year()).then_some(dt)
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn decode_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = decode_iso(trimmed) {
        return Some(dt);
    }
    trimmed.parse::<f64>().ok().and_then(decode_epoch)
}

fn decode_iso(text: &str) -> Option<DateTime<Utc>> {
    parse_iso_forms(text).and_then(four_digit_year)
}

fn parse_iso_forms(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // Space-separated date and time with an offset
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive forms are taken as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn decode_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let unix_micros = if value > 1e16 {
        let micros_since_1601 = value.round() as i64;
        micros_since_1601.checked_sub(CHROME_EPOCH_OFFSET_SECS.checked_mul(1_000_000)?)?
    } else if value > 1e12 {
        (value * 1_000.0).round() as i64
    } else if value > 1e9 {
        (value * 1_000_000.0).round() as i64
    } else if value > 1e8 {
        ((value + COCOA_EPOCH_OFFSET_SECS as f64) * 1_000_000.0).round() as i64
    } else {
        return None;
    };

    let secs = unix_micros.div_euclid(1_000_000);
    let nanos = (unix_micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).and_then(four_digit_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NEW_YEAR_2024: &str = "2024-01-01T00:00:00+00:00";

    #[test]
    fn test_epoch_schemes_agree() {
        assert_eq!(normalize_timestamp(1_704_067_200_i64).as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(normalize_timestamp(1_704_067_200_000_i64).as_deref(), Some(NEW_YEAR_2024));

        let chrome = (1_704_067_200_i64 + CHROME_EPOCH_OFFSET_SECS) * 1_000_000;
        assert_eq!(normalize_timestamp(chrome).as_deref(), Some(NEW_YEAR_2024));

        let cocoa = 1_704_067_200_i64 - COCOA_EPOCH_OFFSET_SECS;
        assert_eq!(normalize_timestamp(cocoa).as_deref(), Some(NEW_YEAR_2024));
    }

    #[test]
    fn test_iso_strings() {
        assert_eq!(normalize_timestamp("2024-01-01T00:00:00Z").as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(normalize_timestamp("2024-01-01T00:00:00").as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(normalize_timestamp("2024-01-01").as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(
            normalize_timestamp("2024-01-01T02:00:00+02:00").as_deref(),
            Some(NEW_YEAR_2024)
        );
        assert_eq!(
            normalize_timestamp("2024-01-01T00:00:00.250Z").as_deref(),
            Some("2024-01-01T00:00:00.250+00:00")
        );
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(normalize_timestamp("1704067200").as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(normalize_timestamp(" 1704067200000 ").as_deref(), Some(NEW_YEAR_2024));
    }

    #[test]
    fn test_rejected_inputs() {
        assert_eq!(normalize_timestamp(0_i64), None);
        assert_eq!(normalize_timestamp(-5_i64), None);
        assert_eq!(normalize_timestamp(12_345_i64), None);
        assert_eq!(normalize_timestamp(f64::NAN), None);
        assert_eq!(normalize_timestamp(f64::INFINITY), None);
        assert_eq!(normalize_timestamp(f64::MAX), None);
        assert_eq!(normalize_timestamp(""), None);
        assert_eq!(normalize_timestamp("yesterday"), None);
    }

    #[test]
    fn test_out_of_range_years_rejected() {
        // Milliseconds landing in year 17814
        assert_eq!(normalize_timestamp(500_000_000_000_000_i64), None);
        assert_eq!(normalize_timestamp(1e16), None);
        assert_eq!(normalize_timestamp("+17814-05-16T00:53:20+00:00"), None);
        assert_eq!(parse_iso("+10000-01-01T00:00:00Z"), None);

        let far = DateTime::<Utc>::from_timestamp(500_000_000_000, 0).unwrap();
        assert_eq!(normalize_timestamp(far), None);

        assert_eq!(
            normalize_timestamp("9999-12-31T23:59:59Z").as_deref(),
            Some("9999-12-31T23:59:59+00:00")
        );
    }

    #[test]
    fn test_json_values() {
        assert_eq!(normalize_json_timestamp(&json!(1_704_067_200)).as_deref(), Some(NEW_YEAR_2024));
        assert_eq!(
            normalize_json_timestamp(&json!("2024-01-01T00:00:00Z")).as_deref(),
            Some(NEW_YEAR_2024)
        );
        assert_eq!(normalize_json_timestamp(&json!(null)), None);
        assert_eq!(normalize_json_timestamp(&json!({"t": 1})), None);
    }

    #[test]
    fn test_output_sorts_chronologically() {
        let whole = normalize_timestamp("2024-01-01T00:00:00Z").unwrap();
        let fractional = normalize_timestamp("2024-01-01T00:00:00.500Z").unwrap();
        let later = normalize_timestamp("2024-01-01T00:00:01Z").unwrap();
        assert!(whole < fractional);
        assert!(fractional < later);
    }
}
