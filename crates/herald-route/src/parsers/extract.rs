//! Field extraction helpers shared by the built-in parsers.
//!
//! Every helper answers with an `Option`: a missing, empty or wrongly typed
//! field is "no value" and the caller falls through to its next candidate or
//! documented default.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A payload after the decode step.
#[derive(Debug)]
pub(crate) enum Payload<'a> {
    /// Structured data, either handed in decoded or decoded from a JSON string.
    Structured(Cow<'a, Value>),
    /// A string that is not a JSON document.
    Text(&'a str),
}

/// Decodes a string payload as JSON, falling back to free text.
pub(crate) fn decode(raw: &Value) -> Payload<'_> {
    match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => Payload::Structured(Cow::Owned(value)),
            Err(_) => Payload::Text(text),
        },
        other => Payload::Structured(Cow::Borrowed(other)),
    }
}

/// Renders a payload as the single string that recognition patterns run over.
#[must_use]
pub fn stringify(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Returns the object stored under `key`, if it is one.
pub(crate) fn object<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key).and_then(Value::as_object)
}

/// Returns the field as text: non-empty strings as-is, numbers rendered.
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first key that yields text.
pub(crate) fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(value, key))
}

/// Collects the string-valued entries of an object.
pub(crate) fn string_entries(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Collects the scalar entries of an object, rendering numbers and booleans.
pub(crate) fn scalar_entries(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.clone(), rendered))
        })
        .collect()
}

/// Reads a timestamp field.
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS` (taken as UTC) and epoch
/// milliseconds, either as a number or as a numeric string.
pub(crate) fn timestamp(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => parse_time(s),
        _ => None,
    }
}

/// Returns the first key that yields a timestamp.
pub(crate) fn first_timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| timestamp(value, key))
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    s.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Returns the trimmed first capture group of `pattern` in `text`.
pub(crate) fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Generates a fallback identifier for payloads that carry none.
pub(crate) fn fallback_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Pretty-prints a JSON value, falling back to the compact form.
pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
