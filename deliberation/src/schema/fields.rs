//! Tolerant field readers over raw stage output.
//!
//! Optional fields are never fatal here: a missing, null or oddly-typed value
//! reads as `None` / empty. Required fields are enforced earlier, at the
//! contract boundary.

use serde_json::{Map, Value};

/// Placeholder strings models emit instead of a JSON null.
const NULLISH: &[&str] = &["null", "none", "n/a", ""];

/// Read a textual field. Numbers and booleans are stringified; null-ish
/// placeholders read as `None`.
pub fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(as_text)
}

/// First present textual field among `keys`.
pub fn text_any(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(v, k))
}

pub fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let trimmed = s.trim();
            if NULLISH.contains(&trimmed.to_ascii_lowercase().as_str()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a list of strings; non-textual elements are skipped.
pub fn texts(v: &Value, key: &str) -> Vec<String> {
    array(v, key).iter().filter_map(as_text).collect()
}

/// Elements of an array field, or an empty slice.
pub fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// An object field, ignoring non-object values.
pub fn object<'a>(v: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    v.get(key).and_then(Value::as_object)
}

/// First present object field among `keys`.
pub fn object_any<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .find(|candidate| candidate.is_object())
}

/// A 1–100 score. Fractional values are rounded; anything outside the range
/// reads as `None`.
pub fn score(v: &Value) -> Option<u8> {
    let n = v.as_f64()?;
    let rounded = n.round();
    if (1.0..=100.0).contains(&rounded) {
        Some(rounded as u8)
    } else {
        None
    }
}

pub fn score_field(v: &Value, key: &str) -> Option<u8> {
    v.get(key).and_then(score)
}

pub fn bool_field(v: &Value, key: &str) -> Option<bool> {
    match v.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Uppercase a rating-like label (`"high"` → `"HIGH"`), dropping placeholders.
pub fn label(v: &Value, key: &str) -> Option<String> {
    text(v, key).map(|s| s.to_ascii_uppercase())
}
