//! Time-series store
//!
//! Owns the persisted columnar log, its CSV export and archive rotation:
//! - Initialize: load `Data.json`, or create it (and the export header)
//! - Append: push one timestamped row and persist synchronously
//! - ExportRow: append the latest snapshot to `Data.csv`
//! - Rotate: archive both files and restart seeded with the last snapshot
//!
//! Single-writer: exactly one controller process owns these files.

use crate::storage::archive::{apply_retention, archive_target, RenamePlan, RetentionPolicy};
use crate::storage::columns::Columns;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::export::{write_header, TabularExport};
use crate::storage::persist::{ensure_dir, read_if_present, staging_path, write_atomic};
use crate::storage::types::{FieldKind, FieldMapping, Snapshot, Value};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Default timestamp rendering for the `Date` column
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Configuration for the time-series store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the live store and export
    pub data_dir: PathBuf,
    /// Directory receiving rotated archives
    pub archive_dir: PathBuf,
    /// File name of the persisted columnar store
    pub store_file: String,
    /// File name of the CSV export
    pub export_file: String,
    /// chrono format string for the timestamp column
    pub timestamp_format: String,
    /// Which archives survive rotation
    pub retention: RetentionPolicy,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            archive_dir: data_dir.join("archive"),
            data_dir,
            store_file: "Data.json".to_string(),
            export_file: "Data.csv".to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Get path to the persisted store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    /// Get path to the CSV export
    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(&self.export_file)
    }
}

/// Where the archives of one rotation ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Archived store, `None` if retention removed it
    pub store_archive: Option<PathBuf>,
    /// Archived export, `None` if retention removed it or there was no export
    pub export_archive: Option<PathBuf>,
}

/// The append-only usage log
pub struct TimeSeriesStore {
    config: StoreConfig,
    mapping: FieldMapping,
    columns: Columns,
    export: TabularExport,
    /// Mirror every append into the export (test harness behaviour)
    export_on_append: bool,
}

impl TimeSeriesStore {
    /// Load the persisted store, creating an empty one on first run.
    ///
    /// Safe to call on every start: an existing store is loaded as-is and
    /// the export header is only written when the export is missing or
    /// empty. With `test_mode` every append is also exported.
    pub fn initialize(
        config: StoreConfig,
        mapping: FieldMapping,
        test_mode: bool,
    ) -> StorageResult<Self> {
        ensure_dir(&config.data_dir)?;

        let store_path = config.store_path();
        let export = TabularExport::new(config.export_path());
        recover_rotation(&config)?;

        let columns = match read_if_present(&store_path)? {
            Some(bytes) => {
                let columns = Columns::load(&bytes, &mapping, &store_path)?;
                tracing::info!(
                    path = ?store_path,
                    rows = columns.row_count(),
                    "Loaded store"
                );
                columns
            }
            None => {
                tracing::info!(
                    path = ?store_path,
                    "{}",
                    StorageError::MissingStore(store_path.clone())
                );
                let columns = Columns::seeded(&mapping);
                persist(&store_path, &columns)?;
                columns
            }
        };

        if export.ensure_header(&mapping)? {
            tracing::info!(path = ?export.path(), "Created export");
        }

        Ok(Self {
            config,
            mapping,
            columns,
            export,
            export_on_append: test_mode,
        })
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.row_count()
    }

    pub fn export(&self) -> &TabularExport {
        &self.export
    }

    /// Last value of every field; all zeros for an empty store
    pub fn snapshot(&self) -> Snapshot {
        match self.columns.last_row() {
            Some(row) => Snapshot::from_entries(
                self.mapping
                    .fields()
                    .iter()
                    .zip(row)
                    .map(|(field, value)| (field.key.clone(), value.clone()))
                    .collect(),
            ),
            None => Snapshot::zeroed(&self.mapping),
        }
    }

    /// Append one row: the current time plus `values`, matched by field key.
    ///
    /// Every non-timestamp field must be present and every key must be
    /// mapped; a timestamp entry in `values` is ignored. On a failed write
    /// the in-memory row is dropped again so memory never runs ahead of disk.
    pub fn append(&mut self, values: &Snapshot) -> StorageResult<()> {
        for (key, _) in values.iter() {
            if self.mapping.get(key).is_none() {
                return Err(StorageError::UnknownField(key.to_string()));
            }
        }

        let now = Local::now().format(&self.config.timestamp_format).to_string();
        let mut row = Vec::with_capacity(self.mapping.len());
        for field in self.mapping.fields() {
            if field.kind == FieldKind::Timestamp {
                row.push(Value::Text(now.clone()));
                continue;
            }
            let value = values
                .get(&field.key)
                .ok_or_else(|| StorageError::MissingField(field.key.clone()))?;
            row.push(value.clone());
        }

        self.columns.push_row(row);
        if let Err(e) = persist(&self.config.store_path(), &self.columns) {
            self.columns.pop_row();
            return Err(e);
        }

        tracing::debug!(rows = self.columns.row_count(), "Appended row");

        if self.export_on_append {
            self.export_row()?;
        }
        Ok(())
    }

    /// Bump one counter field by one and append; returns the new value
    pub fn increment(&mut self, key: &str) -> StorageResult<i64> {
        match self.mapping.get(key) {
            Some(field) if field.kind != FieldKind::Timestamp => {}
            _ => return Err(StorageError::UnknownField(key.to_string())),
        }

        let mut snapshot = self.snapshot();
        let current = snapshot
            .get(key)
            .and_then(Value::as_counter)
            .ok_or_else(|| StorageError::NotACounter(key.to_string()))?;
        let next = current + 1;
        snapshot.set(key, next);
        self.append(&snapshot)?;
        Ok(next)
    }

    /// Append the current snapshot to the CSV export
    pub fn export_row(&self) -> StorageResult<()> {
        self.export.ensure_header(&self.mapping)?;
        self.export.append_row(&self.mapping, &self.snapshot())?;
        tracing::debug!(path = ?self.export.path(), "Exported snapshot");
        Ok(())
    }

    /// Rotate using today's local date
    pub fn rotate(&mut self) -> StorageResult<RotationReport> {
        self.rotate_on(Local::now().date_naive())
    }

    /// Archive the store and export under `date` and restart both.
    ///
    /// The fresh store is seeded with the pre-rotation snapshot (timestamp
    /// included), so `snapshot()` is identical before and after.
    pub fn rotate_on(&mut self, date: NaiveDate) -> StorageResult<RotationReport> {
        let captured = self.snapshot();
        let store_path = self.config.store_path();
        let export_path = self.config.export_path();
        ensure_dir(&self.config.archive_dir)?;

        let mut fresh = Columns::seeded(&self.mapping);
        fresh.push_row(
            self.mapping
                .fields()
                .iter()
                .map(|f| captured.get(&f.key).cloned().unwrap_or_default())
                .collect(),
        );

        let staged_store = staging_path(&store_path, "next");
        let staged_export = staging_path(&export_path, "next");
        let staged = persist(&staged_store, &fresh)
            .and_then(|_| write_header(&staged_export, &self.mapping));
        if let Err(e) = staged {
            discard_staging(&store_path);
            discard_staging(&export_path);
            return Err(e);
        }

        let store_archive = archive_target(&self.config.archive_dir, &store_path, date);
        let export_archive = if export_path.exists() {
            Some(archive_target(&self.config.archive_dir, &export_path, date))
        } else {
            tracing::warn!(path = ?export_path, "Export missing at rotation, nothing to archive");
            None
        };

        let mut plan = RenamePlan::new();
        plan.rename(&store_path, &store_archive);
        if let Some(target) = &export_archive {
            plan.rename(&export_path, target);
        }
        plan.rename(&staged_store, &store_path)
            .rename(&staged_export, &export_path);

        if let Err(e) = plan.commit() {
            discard_staging(&store_path);
            discard_staging(&export_path);
            return Err(e);
        }

        self.columns = fresh;
        plan.sync()?;

        let policy = self.config.retention;
        apply_retention(policy, &store_archive, export_archive.as_deref());

        tracing::info!(
            store_archive = ?store_archive,
            export_archive = ?export_archive,
            "Rotated store"
        );

        Ok(RotationReport {
            store_archive: policy.keep_store_archive.then_some(store_archive),
            export_archive: export_archive.filter(|_| policy.keep_export_archive),
        })
    }
}

fn persist(path: &Path, columns: &Columns) -> StorageResult<()> {
    let bytes = columns
        .to_json()
        .map_err(|e| StorageError::write(path, e.into()))?;
    write_atomic(path, &bytes)
}

/// Bring the data directory back to a consistent state after a crash
/// during rotation.
///
/// Rotation commits as: store to archive, export to archive, staged store
/// to live, staged export to live. Staged files are promoted once the live
/// file they replace has been archived; with both live files present they
/// are leftovers of an aborted staging and are discarded.
fn recover_rotation(config: &StoreConfig) -> StorageResult<()> {
    let store_path = config.store_path();
    let export_path = config.export_path();
    let staged_store = staging_path(&store_path, "next");
    let staged_export = staging_path(&export_path, "next");

    let mut plan = RenamePlan::new();
    if !store_path.exists() && staged_store.exists() {
        if export_path.exists() && staged_export.exists() {
            ensure_dir(&config.archive_dir)?;
            let target =
                archive_target(&config.archive_dir, &export_path, Local::now().date_naive());
            plan.rename(&export_path, target);
        }
        plan.rename(&staged_store, &store_path);
        if staged_export.exists() {
            plan.rename(&staged_export, &export_path);
        }
    } else if store_path.exists() && !export_path.exists() && staged_export.exists() {
        plan.rename(&staged_export, &export_path);
    } else {
        discard_staging(&store_path);
        discard_staging(&export_path);
        return Ok(());
    }

    plan.commit()?;
    plan.sync()?;
    tracing::warn!(path = ?store_path, "Completed interrupted rotation");
    Ok(())
}

/// Remove leftovers of an aborted staging
fn discard_staging(path: &Path) {
    let staged = staging_path(path, "next");
    match std::fs::remove_file(&staged) {
        Ok(()) => tracing::warn!(path = ?staged, "Discarded staged file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = ?staged, error = %e, "Failed to discard staged file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{
        Field, CFH_COUNTER, COLUMBIA_TIMER, WELL_RECHARGE_COUNTER, WELL_TIMER,
    };
    use tempfile::tempdir;

    fn create_test_store(dir: &Path, test_mode: bool) -> TimeSeriesStore {
        let config = StoreConfig::new(dir);
        TimeSeriesStore::initialize(config, FieldMapping::standard(), test_mode).unwrap()
    }

    fn values(well: i64) -> Snapshot {
        Snapshot::default()
            .with(WELL_RECHARGE_COUNTER, 1)
            .with(COLUMBIA_TIMER, 0)
            .with(WELL_TIMER, well)
            .with(CFH_COUNTER, 2)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_initialize_empty() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path(), false);

        assert_eq!(store.columns().column_count(), 5);
        assert_eq!(store.row_count(), 0);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 5);
        assert!(snapshot.iter().all(|(_, v)| *v == Value::zero()));

        assert!(store.config().store_path().exists());
        assert_eq!(store.export().data_row_count().unwrap(), 0);
    }

    #[test]
    fn test_initialize_twice_keeps_data() {
        let dir = tempdir().unwrap();
        {
            let mut store = create_test_store(dir.path(), true);
            store.append(&values(5)).unwrap();
        }

        let store = create_test_store(dir.path(), true);
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.snapshot().counter(WELL_TIMER), 5);

        let csv = std::fs::read_to_string(store.export().path()).unwrap();
        assert_eq!(csv.matches("Date,").count(), 1, "header must not repeat");
        assert_eq!(store.export().data_row_count().unwrap(), 1);
    }

    #[test]
    fn test_three_appends_scenario() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), true);

        for well in 1..=3 {
            store.append(&values(well)).unwrap();
            let lengths: Vec<usize> =
                store.columns().columns().iter().map(|c| c.values.len()).collect();
            assert!(lengths.iter().all(|&l| l == well as usize));
        }

        assert_eq!(store.snapshot().counter(WELL_TIMER), 3);
        let csv = std::fs::read_to_string(store.export().path()).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert_eq!(store.export().data_row_count().unwrap(), 3);
    }

    #[test]
    fn test_append_stamps_date() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), false);
        store.append(&values(1)).unwrap();

        let stamp = store.snapshot().get(crate::storage::types::DATE).cloned().unwrap();
        let Value::Text(text) = stamp else {
            panic!("timestamp should be text");
        };
        assert!(chrono::NaiveDateTime::parse_from_str(&text, DEFAULT_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_append_rejects_bad_keys() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), false);

        let err = store.append(&values(1).with("PUMP_TIMER", 1)).unwrap_err();
        assert!(matches!(err, StorageError::UnknownField(ref k) if k == "PUMP_TIMER"));

        let partial = Snapshot::default().with(WELL_TIMER, 1);
        let err = store.append(&partial).unwrap_err();
        assert!(matches!(err, StorageError::MissingField(_)));

        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn test_append_write_failure_rolls_back() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let mut store = create_test_store(&data_dir, false);
        store.append(&values(1)).unwrap();

        // Replace the data directory with a plain file
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, b"not a directory").unwrap();

        let err = store.append(&values(2)).unwrap_err();
        assert!(matches!(err, StorageError::WriteFailure { .. }));
        assert!(err.is_fatal());
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.snapshot().counter(WELL_TIMER), 1);
    }

    #[test]
    fn test_increment() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), false);

        assert_eq!(store.increment(CFH_COUNTER).unwrap(), 1);
        assert_eq!(store.increment(CFH_COUNTER).unwrap(), 2);
        assert_eq!(store.increment(WELL_TIMER).unwrap(), 1);
        assert_eq!(store.row_count(), 3);
        assert_eq!(store.snapshot().counter(CFH_COUNTER), 2);

        assert!(matches!(
            store.increment("DATE"),
            Err(StorageError::UnknownField(_))
        ));
    }

    #[test]
    fn test_export_row_uses_snapshot() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), false);
        store.append(&values(90)).unwrap();
        assert_eq!(store.export().data_row_count().unwrap(), 0);

        store.export_row().unwrap();
        let csv = std::fs::read_to_string(store.export().path()).unwrap();
        assert!(csv.trim_end().ends_with(",1,0:00,1:30,2"));
    }

    #[test]
    fn test_rotate_preserves_snapshot() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), true);
        for well in 1..=4 {
            store.append(&values(well)).unwrap();
        }

        let before = store.snapshot();
        let report = store.rotate_on(date()).unwrap();
        let after = store.snapshot();

        assert_eq!(before, after);
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.export().data_row_count().unwrap(), 0);

        // Default retention keeps only the export archive
        assert!(report.store_archive.is_none());
        let export_archive = report.export_archive.unwrap();
        assert!(export_archive.ends_with("archive/Data-2026-10-15.csv"));
        let archived = std::fs::read_to_string(&export_archive).unwrap();
        assert_eq!(archived.lines().count(), 5);

        // Reload sees the seeded row
        drop(store);
        let store = create_test_store(dir.path(), true);
        assert_eq!(store.snapshot(), before);
    }

    /// Stage a rotation the way `rotate_on` does, without committing it
    fn stage_rotation(store: &TimeSeriesStore) -> (PathBuf, PathBuf) {
        let snapshot = store.snapshot();
        let mut fresh = Columns::seeded(store.mapping());
        fresh.push_row(
            store
                .mapping()
                .fields()
                .iter()
                .map(|f| snapshot.get(&f.key).cloned().unwrap_or_default())
                .collect(),
        );
        let staged_store = staging_path(&store.config().store_path(), "next");
        let staged_export = staging_path(&store.config().export_path(), "next");
        persist(&staged_store, &fresh).unwrap();
        write_header(&staged_export, store.mapping()).unwrap();
        (staged_store, staged_export)
    }

    fn archived(dir: &Path, ext: &str) -> Vec<PathBuf> {
        std::fs::read_dir(dir.join("archive"))
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().path())
                    .filter(|p| p.extension().map_or(false, |x| x == ext))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_restart_after_store_archived_completes_rotation() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), true);
        store.append(&values(42)).unwrap();
        let before = store.snapshot();

        // Crash right after the first rename of the commit
        let (staged_store, staged_export) = stage_rotation(&store);
        let archive_dir = store.config().archive_dir.clone();
        std::fs::create_dir_all(&archive_dir).unwrap();
        std::fs::rename(
            store.config().store_path(),
            archive_dir.join("Data-2026-10-15.json"),
        )
        .unwrap();
        drop(store);

        let store = create_test_store(dir.path(), true);
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.snapshot().counter(WELL_TIMER), 42);
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.export().data_row_count().unwrap(), 0);
        assert!(!staged_store.exists() && !staged_export.exists());

        // The pre-rotation export went to the archive, not away
        let exports = archived(dir.path(), "csv");
        assert_eq!(exports.len(), 1);
        let archived_csv = std::fs::read_to_string(&exports[0]).unwrap();
        assert_eq!(archived_csv.lines().count(), 2);
    }

    #[test]
    fn test_restart_after_store_promoted_finishes_export() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), true);
        store.append(&values(42)).unwrap();
        let before = store.snapshot();

        // Crash before the staged export was moved into place
        let (staged_store, staged_export) = stage_rotation(&store);
        let archive_dir = store.config().archive_dir.clone();
        std::fs::create_dir_all(&archive_dir).unwrap();
        std::fs::rename(
            store.config().store_path(),
            archive_dir.join("Data-2026-10-15.json"),
        )
        .unwrap();
        std::fs::rename(
            store.config().export_path(),
            archive_dir.join("Data-2026-10-15.csv"),
        )
        .unwrap();
        std::fs::rename(&staged_store, store.config().store_path()).unwrap();
        drop(store);

        let store = create_test_store(dir.path(), true);
        assert_eq!(store.snapshot(), before);
        assert!(!staged_export.exists());
        assert_eq!(store.export().data_row_count().unwrap(), 0);
        assert_eq!(archived(dir.path(), "csv").len(), 1);
    }

    #[test]
    fn test_restart_discards_aborted_staging() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), true);
        store.append(&values(1)).unwrap();
        store.append(&values(2)).unwrap();

        let (staged_store, staged_export) = stage_rotation(&store);
        drop(store);

        let store = create_test_store(dir.path(), true);
        assert_eq!(store.row_count(), 2);
        assert_eq!(store.export().data_row_count().unwrap(), 2);
        assert!(!staged_store.exists() && !staged_export.exists());
        assert!(archived(dir.path(), "json").is_empty());
    }

    #[test]
    fn test_rotate_empty_store() {
        let dir = tempdir().unwrap();
        let mut store = create_test_store(dir.path(), false);
        let before = store.snapshot();
        store.rotate_on(date()).unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_rotate_keeps_both_archives_when_configured() {
        let dir = tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.retention = RetentionPolicy {
            keep_store_archive: true,
            keep_export_archive: true,
        };
        let mut store =
            TimeSeriesStore::initialize(config, FieldMapping::standard(), false).unwrap();
        store.append(&values(7)).unwrap();

        let first = store.rotate_on(date()).unwrap();
        let second = store.rotate_on(date()).unwrap();

        let first_store = first.store_archive.unwrap();
        let second_store = second.store_archive.unwrap();
        assert!(first_store.ends_with("Data-2026-10-15.json"));
        assert!(second_store.ends_with("Data-2026-10-15-1.json"));

        let archived = std::fs::read(&first_store).unwrap();
        let columns =
            Columns::load(&archived, &FieldMapping::standard(), &first_store).unwrap();
        assert_eq!(columns.row_count(), 1);
        assert_eq!(store.snapshot().counter(WELL_TIMER), 7);
    }

    fn pump_mapping() -> FieldMapping {
        FieldMapping::new(
            "DATE",
            "Date",
            [
                Field::new("PUMP_STARTS", "Pump Starts", FieldKind::Counter),
                Field::new("RUN_TIME", "Run Time", FieldKind::Duration),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_timestamp_only_mapping() {
        let dir = tempdir().unwrap();
        let mapping = FieldMapping::new("DATE", "Date", Vec::<Field>::new()).unwrap();
        let mut store =
            TimeSeriesStore::initialize(StoreConfig::new(dir.path()), mapping, false).unwrap();

        assert_eq!(store.columns().column_count(), 1);
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.snapshot().get("DATE"), Some(&Value::zero()));

        store.append(&Snapshot::default()).unwrap();
        assert_eq!(store.row_count(), 1);
        assert!(matches!(store.snapshot().get("DATE"), Some(Value::Text(_))));

        store.export_row().unwrap();
        let csv = std::fs::read_to_string(store.export().path()).unwrap();
        assert_eq!(csv.lines().next(), Some("Date"));
        assert_eq!(store.export().data_row_count().unwrap(), 1);

        let before = store.snapshot();
        store.rotate_on(date()).unwrap();
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.row_count(), 1);
    }

    #[test]
    fn test_custom_mapping_round_trip() {
        let dir = tempdir().unwrap();
        let mut store =
            TimeSeriesStore::initialize(StoreConfig::new(dir.path()), pump_mapping(), false)
                .unwrap();

        assert_eq!(store.columns().column_count(), 3);
        assert!(store.columns().columns().iter().all(|c| c.values.is_empty()));
        let zeros = store.snapshot();
        assert_eq!(zeros.len(), 3);
        assert!(zeros.iter().all(|(_, v)| *v == Value::zero()));

        let values = Snapshot::default().with("PUMP_STARTS", 3).with("RUN_TIME", 125);
        store.append(&values).unwrap();
        assert_eq!(store.increment("PUMP_STARTS").unwrap(), 4);
        assert!(matches!(
            store.append(&values.clone().with(WELL_TIMER, 1)),
            Err(StorageError::UnknownField(_))
        ));

        store.export_row().unwrap();
        let csv = std::fs::read_to_string(store.export().path()).unwrap();
        assert_eq!(csv.lines().next(), Some("Date,Pump Starts,Run Time"));
        assert!(csv.trim_end().ends_with(",4,2:05"));

        let before = store.snapshot();
        store.rotate_on(date()).unwrap();
        assert_eq!(store.snapshot(), before);
        drop(store);

        let store =
            TimeSeriesStore::initialize(StoreConfig::new(dir.path()), pump_mapping(), false)
                .unwrap();
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.snapshot().counter("RUN_TIME"), 125);
    }

    #[test]
    fn test_malformed_store_is_fatal() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        std::fs::write(config.store_path(), b"{\"Date\": [1, 2").unwrap();

        let err = TimeSeriesStore::initialize(config, FieldMapping::standard(), false)
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::MalformedStore { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_store_file_is_recreated() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        std::fs::write(config.store_path(), b"").unwrap();

        let store = TimeSeriesStore::initialize(config, FieldMapping::standard(), false).unwrap();
        assert_eq!(store.row_count(), 0);
        assert!(std::fs::metadata(store.config().store_path()).unwrap().len() > 0);
    }
}
