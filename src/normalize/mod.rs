//! Maps raw store records onto canonical models.
//!
//! Nothing in here fails: missing or oddly typed fields fall back to empty
//! strings and empty lists.

mod course;
mod enrollment;

pub use course::{COURSE_FIELDS, normalize_course, normalize_courses};
pub use enrollment::{ENROLLMENT_FIELDS, normalize_enrollment, normalize_enrollments};

use serde_json::Value;

use crate::models::Timestamp;
use crate::store::RawRecord;

/// Where a canonical field may be found in a raw record, newest name first.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub canonical: &'static str,
    pub sources: &'static [&'static str],
}

impl FieldAlias {
    pub const fn new(canonical: &'static str, sources: &'static [&'static str]) -> Self {
        Self { canonical, sources }
    }

    /// First source field holding a non-empty value.
    pub fn resolve<'a>(&self, raw: &'a RawRecord) -> Option<&'a Value> {
        self.sources
            .iter()
            .filter_map(|source| raw.get(*source))
            .find(|value| !is_empty(value))
    }
}

/// Looks up `canonical` in `table` and resolves it against `raw`.
pub(crate) fn lookup<'a>(table: &[FieldAlias], canonical: &str, raw: &'a RawRecord) -> Option<&'a Value> {
    table
        .iter()
        .find(|alias| alias.canonical == canonical)
        .and_then(|alias| alias.resolve(raw))
}

pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        other => is_empty(other),
    }
}

pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// A list, or a map read in key order, as strings. Falsy and nested entries are dropped.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    let items = match value {
        Some(scalar @ (Value::String(_) | Value::Number(_))) => vec![scalar],
        other => entries(other),
    };
    items
        .into_iter()
        .filter(|item| !is_falsy(item))
        .filter(|item| !item.is_array() && !item.is_object())
        .map(|item| text(Some(item)))
        .collect()
}

/// Entries of a list, or of a map in key order. Integer keys (how the store
/// writes arrays) come first in numeric order, then the remaining keys.
pub(crate) fn entries(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => {
            let mut keyed: Vec<(Option<u64>, &Value)> = map
                .iter()
                .map(|(key, item)| (array_index(key), item))
                .collect();
            // stable sort keeps the map order among non-integer keys
            keyed.sort_by_key(|(index, _)| index.map_or((1, 0), |i| (0, i)));
            keyed.into_iter().map(|(_, item)| item).collect()
        }
        _ => Vec::new(),
    }
}

fn array_index(key: &str) -> Option<u64> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

pub(crate) fn timestamp(value: Option<&Value>) -> Timestamp {
    match value {
        Some(Value::Number(n)) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
            Some(ms) => Timestamp::Millis(ms),
            None => Timestamp::Missing,
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Timestamp::Missing
            } else if let Ok(ms) = trimmed.parse::<i64>() {
                Timestamp::Millis(ms)
            } else {
                Timestamp::Iso(trimmed.to_string())
            }
        }
        _ => Timestamp::Missing,
    }
}

pub(crate) fn millis(value: Option<&Value>) -> Option<i64> {
    match timestamp(value) {
        Timestamp::Millis(ms) => Some(ms),
        _ => None,
    }
}
