//! In-memory columnar store
//!
//! The persisted form is a JSON object mapping column label to an array of
//! scalars, e.g. `{"Date": ["10/15/2026 07:00:00"], "Well Timer": [3]}`.
//! Object key order follows the field mapping and is preserved on load.
//!
//! Invariant: every column has the same length.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{FieldMapping, Value};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// A named column of scalar values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: String,
    pub values: Vec<Value>,
}

/// Label-ordered set of equal-length columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Columns {
    columns: Vec<Column>,
}

impl Columns {
    /// Empty columns, one per mapped field
    pub fn seeded(mapping: &FieldMapping) -> Self {
        Self {
            columns: mapping
                .labels()
                .map(|label| Column {
                    label: label.to_string(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Parse persisted bytes and reorder them to match `mapping`.
    ///
    /// Fails if the JSON is invalid, the columns differ in length, or the
    /// labels are not exactly those of the mapping.
    pub fn load(bytes: &[u8], mapping: &FieldMapping, path: &Path) -> StorageResult<Self> {
        let parsed: Columns = serde_json::from_slice(bytes)
            .map_err(|e| StorageError::malformed(path, e.to_string()))?;

        let rows = parsed.columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = parsed.columns.iter().find(|c| c.values.len() != rows) {
            return Err(StorageError::malformed(
                path,
                format!(
                    "column {:?} has {} values, expected {}",
                    bad.label,
                    bad.values.len(),
                    rows
                ),
            ));
        }

        let mut remaining = parsed.columns;
        let mut ordered = Vec::with_capacity(mapping.len());
        for label in mapping.labels() {
            let idx = remaining
                .iter()
                .position(|c| c.label == label)
                .ok_or_else(|| StorageError::malformed(path, format!("missing column {:?}", label)))?;
            ordered.push(remaining.remove(idx));
        }
        if let Some(extra) = remaining.first() {
            return Err(StorageError::malformed(
                path,
                format!("unexpected column {:?}", extra.label),
            ));
        }

        Ok(Self { columns: ordered })
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Number of rows (length of every column)
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, label: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.values.as_slice())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Append one value to every column
    ///
    /// `row` must hold exactly one value per column, in column order.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(row.len(), self.columns.len(), "row width must match column count");
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
    }

    /// Remove the last row, if any
    pub fn pop_row(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        for column in &mut self.columns {
            column.values.pop();
        }
    }

    /// The last value of every column, `None` when empty
    pub fn last_row(&self) -> Option<Vec<&Value>> {
        if self.row_count() == 0 {
            return None;
        }
        self.columns.iter().map(|c| c.values.last()).collect()
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.label, &column.values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping column labels to arrays of scalars")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Columns, A::Error> {
                let mut columns: Vec<Column> = Vec::new();
                while let Some((label, values)) = access.next_entry::<String, Vec<Value>>()? {
                    if columns.iter().any(|c| c.label == label) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate column {:?}",
                            label
                        )));
                    }
                    columns.push(Column { label, values });
                }
                Ok(Columns { columns })
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}
