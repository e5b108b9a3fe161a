//! Tabular export
//!
//! Append-only CSV sibling of the columnar store: one header row of field
//! labels, then one row per export. Duration fields are rendered as "H:MM";
//! the timestamp and counters are written as-is. Prior rows are never
//! rewritten.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::persist::{is_absent_or_empty, open_append, write_atomic};
use crate::storage::types::{minutes_as_hours_mins, FieldKind, FieldMapping, Snapshot, Value};
use std::path::{Path, PathBuf};

/// Handle on the CSV export file
#[derive(Debug, Clone)]
pub struct TabularExport {
    path: PathBuf,
}

impl TabularExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the header row if the file is missing or empty.
    ///
    /// Returns `true` when a header was written.
    pub fn ensure_header(&self, mapping: &FieldMapping) -> StorageResult<bool> {
        if !is_absent_or_empty(&self.path) {
            return Ok(false);
        }
        write_header(&self.path, mapping)?;
        Ok(true)
    }

    /// Append `snapshot` as one formatted row
    pub fn append_row(&self, mapping: &FieldMapping, snapshot: &Snapshot) -> StorageResult<()> {
        let record = format_row(mapping, snapshot);

        let file = open_append(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&record)?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::write(&self.path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| StorageError::write(&self.path, e))?;

        Ok(())
    }

    /// Number of data rows (excluding the header)
    pub fn data_row_count(&self) -> StorageResult<usize> {
        if is_absent_or_empty(&self.path) {
            return Ok(0);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }
}

/// Create (or replace) `path` holding only the header row
pub fn write_header(path: &Path, mapping: &FieldMapping) -> StorageResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(mapping.labels())?;
    let bytes = writer
        .into_inner()
        .map_err(|e| StorageError::write(path, e.into_error()))?;
    write_atomic(path, &bytes)
}

/// Render a snapshot in mapping order
pub fn format_row(mapping: &FieldMapping, snapshot: &Snapshot) -> Vec<String> {
    mapping
        .fields()
        .iter()
        .map(|field| {
            let value = snapshot.get(&field.key).cloned().unwrap_or_default();
            format_cell(field.kind, &value)
        })
        .collect()
}

fn format_cell(kind: FieldKind, value: &Value) -> String {
    match (kind, value.as_counter()) {
        (FieldKind::Duration, Some(minutes)) => minutes_as_hours_mins(minutes),
        _ => value.to_string(),
    }
}
