//! Best-effort conversions of dynamically typed record values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Group-by key used for values that are missing or null.
pub const EMPTY_KEY: &str = "(empty)";

/// Numbers, numeric strings and booleans (1/0); everything else is `None`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (SQLite's own format) or a bare `YYYY-MM-DD`.
pub fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Text form of a scalar value; `None` for null.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// String key used to bucket records by a group-by value.
pub fn as_key(value: &Value) -> String {
    match as_text(value) {
        Some(text) if !text.trim().is_empty() => text,
        _ => EMPTY_KEY.to_string(),
    }
}

pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Orders two values: numerically when both are numbers, chronologically when
/// both are dates, otherwise as case-insensitive text. Null sorts first.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a.total_cmp(&b);
    }
    if let (Some(a), Some(b)) = (as_datetime(left), as_datetime(right)) {
        return a.cmp(&b);
    }
    let a = as_text(left).unwrap_or_default().to_lowercase();
    let b = as_text(right).unwrap_or_default().to_lowercase();
    a.cmp(&b)
}
