use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_SECTIONS: usize = 100;
pub const MIN_HOURS: i64 = 1;
pub const MAX_HOURS: i64 = 24;
pub const DEFAULT_HOURS: i64 = 1;
pub const DEFAULT_INTERVAL_MINUTES: i64 = 60;
pub const ALLOWED_INTERVALS: [i64; 2] = [15, 60];

/// A labelled block of hours in an entity's schedule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub hours: i64,
}

/// Per-entity scheduler settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub interval_minutes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self { interval_minutes: DEFAULT_INTERVAL_MINUTES }
    }
}

/// Settings as seen by a reader: `exists` is false when the entity never had
/// settings written, in which case `settings` holds the defaults.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsView {
    pub settings: Settings,
    pub exists: bool,
}

impl SettingsView {
    pub fn missing() -> Self {
        Self { settings: Settings::default(), exists: false }
    }
}

/// Coerce an untrusted value into a canonical section list.
///
/// Never fails: non-arrays become empty, non-object items and empty names are
/// dropped, hours default to 1 and are clamped to 1..=24, duplicate names keep
/// the first occurrence, and the result is capped at [`MAX_SECTIONS`].
pub fn normalize_sections(raw: &Value) -> Vec<Section> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Section> = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else { continue };
        let name = coerce_name(obj.get("name"));
        if name.is_empty() {
            continue;
        }
        let hours = obj
            .get("hours")
            .map_or(Some(DEFAULT_HOURS), coerce_int)
            .unwrap_or(DEFAULT_HOURS)
            .clamp(MIN_HOURS, MAX_HOURS);
        if !seen.insert(name.clone()) {
            continue;
        }
        out.push(Section { name, hours });
        if out.len() == MAX_SECTIONS {
            break;
        }
    }
    out
}

/// Coerce an untrusted value into settings; anything unusable falls back to
/// the default interval.
pub fn normalize_settings(raw: &Value) -> Settings {
    let interval_minutes = raw
        .as_object()
        .and_then(|obj| obj.get("interval_minutes"))
        .and_then(coerce_int)
        .filter(|v| ALLOWED_INTERVALS.contains(v))
        .unwrap_or(DEFAULT_INTERVAL_MINUTES);
    Settings { interval_minutes }
}

/// Best-effort integer cast: integers as-is, floats truncated (saturating),
/// booleans as 0/1, and strings holding a base-10 integer.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| !f.is_nan()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_int_str(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Signed base-10 digits, optionally grouped by single underscores (`1_000`).
/// Values outside i64 saturate by sign.
fn parse_int_str(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let mut acc: i64 = 0;
    let mut saturated = false;
    for c in digits.chars().filter(|c| *c != '_') {
        let d = i64::from(c.to_digit(10)?);
        if saturated {
            continue;
        }
        match acc.checked_mul(10).and_then(|v| v.checked_add(d)) {
            Some(v) => acc = v,
            None => saturated = true,
        }
    }
    Some(match (saturated, negative) {
        (true, true) => i64::MIN,
        (true, false) => i64::MAX,
        (false, true) => -acc,
        (false, false) => acc,
    })
}

/// Names come from any truthy value: strings (trimmed), non-zero numbers,
/// `true`, and non-empty arrays or objects as their JSON text. Everything
/// else yields an empty name, which the caller drops.
fn coerce_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(v @ Value::Array(a)) if !a.is_empty() => v.to_string(),
        Some(v @ Value::Object(o)) if !o.is_empty() => v.to_string(),
        _ => String::new(),
    }
}
