//! Core data types for the wellswitch usage log
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Value`: A single scalar cell (integer, float or text)
//! - `FieldMapping`: Ordered logical field keys and their column labels
//! - `Snapshot`: The most recent value of every field, keyed by field key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field key of the timestamp column in the standard mapping
pub const DATE: &str = "DATE";
/// Number of completed well recharge cycles
pub const WELL_RECHARGE_COUNTER: &str = "WELL_RECHARGE_COUNTER";
/// Accumulated Columbia valve run time
pub const COLUMBIA_TIMER: &str = "COLUMBIA_TIMER";
/// Accumulated well valve run time
pub const WELL_TIMER: &str = "WELL_TIMER";
/// Number of thermostat calls for heat
pub const CFH_COUNTER: &str = "CFH_COUNTER";

/// A single scalar cell of the columnar store
///
/// Serialized untagged, so the persisted JSON holds plain numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// The documented fallback for fields with no recorded value
    pub fn zero() -> Self {
        Value::Integer(0)
    }

    /// Interpret this cell as a whole counter, truncating floats
    pub fn as_counter(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Value::Float(_) => None,
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::zero()
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// How a field is rendered in the tabular export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Row timestamp, always field 0, filled in by the store
    Timestamp,
    /// Raw minute count, exported as "H:MM"
    Duration,
    /// Raw counter, exported as a plain number
    Counter,
}

/// One logical field of the mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Logical identifier used by callers (e.g. "WELL_TIMER")
    pub key: String,
    /// Human-readable column label (e.g. "Well Timer")
    pub label: String,
    /// Export rendering
    pub kind: FieldKind,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }
}

/// Ordered list of fields; field 0 is always the timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    fields: Vec<Field>,
}

impl FieldMapping {
    /// Create a mapping whose first field is the timestamp column.
    ///
    /// Returns `None` when `timestamp_key` or any other key is duplicated.
    pub fn new(
        timestamp_key: impl Into<String>,
        timestamp_label: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Option<Self> {
        let mut all = vec![Field::new(timestamp_key, timestamp_label, FieldKind::Timestamp)];
        for field in fields {
            if field.kind == FieldKind::Timestamp {
                return None;
            }
            if all.iter().any(|f| f.key == field.key || f.label == field.label) {
                return None;
            }
            all.push(field);
        }
        Some(Self { fields: all })
    }

    /// The five-column mapping used by the heating controller
    pub fn standard() -> Self {
        Self {
            fields: vec![
                Field::new(DATE, "Date", FieldKind::Timestamp),
                Field::new(WELL_RECHARGE_COUNTER, "Recharge Counter", FieldKind::Counter),
                Field::new(COLUMBIA_TIMER, "Columbia Timer", FieldKind::Duration),
                Field::new(WELL_TIMER, "Well Timer", FieldKind::Duration),
                Field::new(CFH_COUNTER, "Call For Heat Counter", FieldKind::Counter),
            ],
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.label.as_str())
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::standard()
    }
}

/// The most recently recorded value of every field, in mapping order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    entries: Vec<(String, Value)>,
}

impl Snapshot {
    /// A snapshot with every field defaulted to zero
    pub fn zeroed(mapping: &FieldMapping) -> Self {
        Self {
            entries: mapping
                .fields()
                .iter()
                .map(|f| (f.key.clone(), Value::zero()))
                .collect(),
        }
    }

    pub(crate) fn from_entries(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Counter value of a field, zero when absent or non-numeric
    pub fn counter(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_counter).unwrap_or(0)
    }

    /// Set a field, adding it when absent
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Builder method: set a field
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render a raw minute count as "H:MM"
pub fn minutes_as_hours_mins(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    format!("{}{}:{:02}", sign, minutes / 60, minutes % 60)
}
