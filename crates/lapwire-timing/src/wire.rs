//! Defensive accessors for the feed's loosely typed JSON.
//!
//! The feed encodes the same thing in several ways: collections arrive as
//! lists or as maps keyed by stringified indices, booleans as `true` or
//! `"true"`, numbers as numbers or strings, and a field that is "present
//! but empty" (`""`) means something different from an absent one. All of
//! that is normalized here so the reconstruction passes never inspect raw
//! shapes.

use std::time::Duration;

use serde_json::Value;

/// Presence of a field in a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// The key is not in the record.
    Absent,
    /// The key is present with `null` or an empty string.
    Empty,
    /// The key is present with a value.
    Present(&'a Value),
}

impl<'a> Field<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// The value, when present and non-empty.
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Look up `key` in `record`.
pub fn field<'a>(record: &'a Value, key: &str) -> Field<'a> {
    match record.get(key) {
        None => Field::Absent,
        Some(Value::Null) => Field::Empty,
        Some(Value::String(text)) if text.trim().is_empty() => Field::Empty,
        Some(value) => Field::Present(value),
    }
}

/// Look up `record[key].Value`; absent when either level is missing.
pub fn value_field<'a>(record: &'a Value, key: &str) -> Field<'a> {
    match record.get(key) {
        Some(inner) => field(inner, "Value"),
        None => Field::Absent,
    }
}

/// Normalize a list, or a map keyed by stringified indices, into
/// `(index, entry)` pairs ordered by index.
pub fn indexed(collection: &Value) -> Vec<(usize, &Value)> {
    match collection {
        Value::Array(items) => items.iter().enumerate().collect(),
        Value::Object(entries) => {
            let mut out: Vec<(usize, &Value)> = entries
                .iter()
                .filter_map(|(key, entry)| match key.trim().parse::<usize>() {
                    Ok(index) => Some((index, entry)),
                    Err(_) => {
                        tracing::warn!(key = %key, "non-numeric collection key, ignoring entry");
                        None
                    }
                })
                .collect();
            out.sort_by_key(|(index, _)| *index);
            out
        }
        _ => Vec::new(),
    }
}

/// Parse `SS.fff`, `M:SS.fff` or `H:MM:SS.fff`.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let mut parts = text.rsplit(':');
    let seconds = parts.next()?;
    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let mut total = digits(whole)?;

    if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos: u32 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse().ok()?
    };

    let mut unit = 60;
    for part in parts {
        if unit > 3600 {
            return None;
        }
        total = total.checked_add(digits(part)?.checked_mul(unit)?)?;
        unit *= 60;
    }
    Some(Duration::new(total, nanos))
}

fn digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// A duration encoded as a time string or as seconds.
pub fn as_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::String(text) => parse_duration(text),
        Value::Number(number) => number
            .as_f64()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        _ => None,
    }
}

/// A non-negative integer encoded as a number or a string.
pub fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// A float encoded as a number or a string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// A boolean encoded as `true`, `"true"`, `"1"` or `1` (and their negations).
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Text as shown on the timing screens; numbers are stringified.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Serialize a `Duration` column as seconds.
pub mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Serialize an optional `Duration` column as seconds or `null`.
pub mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
