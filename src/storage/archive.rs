//! Archive rotation
//!
//! Rotation moves the live store and export into the archive directory as
//! `<base>-<YYYY-MM-DD>.<ext>` and promotes freshly staged replacements in
//! their place. All renames are applied as one [`RenamePlan`]: if any step
//! fails, completed steps are undone in reverse order. Only a failed undo
//! leaves the tree half-rotated, reported as `RotationPartialFailure`.
//!
//! A step counts as done once its rename returns; the touched directories
//! are synced separately with [`RenamePlan::sync`] after the whole plan
//! has committed.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::persist::fsync_dir;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which archive copies survive a rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep the archived raw JSON store
    pub keep_store_archive: bool,
    /// Keep the archived CSV export
    pub keep_export_archive: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_store_archive: false,
            keep_export_archive: true,
        }
    }
}

/// `<stem>-<date>[-<n>].<ext>` for `path`
pub fn archive_name(path: &Path, date: NaiveDate, collision: u32) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = if collision == 0 {
        String::new()
    } else {
        format!("-{}", collision)
    };
    match path.extension() {
        Some(ext) => format!(
            "{}-{}{}.{}",
            stem,
            date.format("%Y-%m-%d"),
            suffix,
            ext.to_string_lossy()
        ),
        None => format!("{}-{}{}", stem, date.format("%Y-%m-%d"), suffix),
    }
}

/// First archive path for `path` on `date` that does not exist yet
///
/// Archives are immutable, so a second rotation on the same day gets a
/// numbered suffix instead of overwriting.
pub fn archive_target(archive_dir: &Path, path: &Path, date: NaiveDate) -> PathBuf {
    let mut collision = 0;
    loop {
        let candidate = archive_dir.join(archive_name(path, date, collision));
        if !candidate.exists() {
            return candidate;
        }
        collision += 1;
    }
}

/// Ordered renames applied all-or-nothing
#[derive(Debug, Default)]
pub struct RenamePlan {
    steps: Vec<(PathBuf, PathBuf)>,
}

impl RenamePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> &mut Self {
        self.steps.push((from.into(), to.into()));
        self
    }

    /// Apply every rename, rolling back on the first failure
    pub fn commit(&self) -> StorageResult<()> {
        for (idx, (from, to)) in self.steps.iter().enumerate() {
            let err = match std::fs::rename(from, to) {
                Ok(()) => continue,
                Err(e) => e,
            };

            tracing::error!(from = ?from, to = ?to, error = %err, "Rotation step failed, rolling back");

            for (done_idx, (done_from, done_to)) in self.steps[..idx].iter().enumerate().rev() {
                if let Err(undo) = std::fs::rename(done_to, done_from) {
                    let committed = self.steps[..=done_idx]
                        .iter()
                        .map(|(_, to)| to.clone())
                        .collect();
                    return Err(StorageError::RotationPartialFailure {
                        committed,
                        failed: from.clone(),
                        reason: format!("{}; rollback of {:?} failed: {}", err, done_to, undo),
                    });
                }
            }

            if let Err(e) = self.sync() {
                tracing::warn!(error = %e, "Failed to sync directories after rollback");
            }
            return Err(StorageError::write(from, err));
        }
        Ok(())
    }

    /// fsync every directory the plan renamed into or out of
    pub fn sync(&self) -> StorageResult<()> {
        let mut dirs: Vec<&Path> = Vec::new();
        for (from, to) in &self.steps {
            for dir in [from.parent(), to.parent()].into_iter().flatten() {
                if !dir.as_os_str().is_empty() && !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        for dir in dirs {
            fsync_dir(dir).map_err(|e| StorageError::write(dir, e))?;
        }
        Ok(())
    }
}

/// Delete archive copies the policy does not retain
///
/// The live store is already committed at this point, so a failed removal
/// only leaves an extra archive behind and is logged, not raised.
pub fn apply_retention(policy: RetentionPolicy, store_archive: &Path, export_archive: Option<&Path>) {
    let mut doomed: Vec<&Path> = Vec::new();
    if !policy.keep_store_archive {
        doomed.push(store_archive);
    }
    if !policy.keep_export_archive {
        doomed.extend(export_archive);
    }

    for path in doomed {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = ?path, "Removed archive per retention policy"),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove archive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(
            archive_name(Path::new("/data/Data.json"), date(), 0),
            "Data-2026-10-15.json"
        );
        assert_eq!(
            archive_name(Path::new("/data/Data.csv"), date(), 2),
            "Data-2026-10-15-2.csv"
        );
        assert_eq!(archive_name(Path::new("log"), date(), 0), "log-2026-10-15");
    }

    #[test]
    fn test_archive_target_skips_existing() {
        let dir = tempdir().unwrap();
        let first = archive_target(dir.path(), Path::new("Data.csv"), date());
        std::fs::write(&first, b"x").unwrap();
        let second = archive_target(dir.path(), Path::new("Data.csv"), date());
        assert_ne!(first, second);
        assert!(second.ends_with("Data-2026-10-15-1.csv"));
    }

    #[test]
    fn test_plan_commits_all_steps() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let mut plan = RenamePlan::new();
        plan.rename(&a, dir.path().join("a2"))
            .rename(&b, dir.path().join("b2"));
        plan.commit().unwrap();

        assert!(!a.exists() && !b.exists());
        assert!(dir.path().join("a2").exists() && dir.path().join("b2").exists());
    }

    #[test]
    fn test_plan_rolls_back_on_failure() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"a").unwrap();
        let missing = dir.path().join("missing");

        let mut plan = RenamePlan::new();
        plan.rename(&a, dir.path().join("a2"))
            .rename(&missing, dir.path().join("m2"));
        let err = plan.commit().unwrap_err();

        assert!(matches!(err, StorageError::WriteFailure { .. }));
        assert!(a.exists(), "first rename must be undone");
        assert!(!dir.path().join("a2").exists());
    }

    #[test]
    fn test_commit_moves_files_before_sync() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("archive");
        std::fs::create_dir(&archive).unwrap();
        let live = dir.path().join("Data.json");
        std::fs::write(&live, b"{}").unwrap();

        let mut plan = RenamePlan::new();
        plan.rename(&live, archive.join("Data-2026-10-15.json"));
        plan.commit().unwrap();

        // The rename is done even though nothing has been synced yet
        assert!(!live.exists());
        assert!(archive.join("Data-2026-10-15.json").exists());

        // A sync failure is reported against the directory, after the fact
        std::fs::remove_dir_all(&archive).unwrap();
        match plan.sync().unwrap_err() {
            StorageError::WriteFailure { path, .. } => assert_eq!(path, archive),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rollback_covers_every_completed_step() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let mut plan = RenamePlan::new();
        plan.rename(&a, dir.path().join("a2"))
            .rename(&b, dir.path().join("b2"))
            .rename(dir.path().join("missing"), dir.path().join("m2"));
        assert!(plan.commit().is_err());

        assert_eq!(std::fs::read(&a).unwrap(), b"a");
        assert_eq!(std::fs::read(&b).unwrap(), b"b");
        assert!(!dir.path().join("a2").exists() && !dir.path().join("b2").exists());
    }

    #[test]
    fn test_retention_policy() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("Data-2026-10-15.json");
        let export = dir.path().join("Data-2026-10-15.csv");
        std::fs::write(&store, b"{}").unwrap();
        std::fs::write(&export, b"h\n").unwrap();

        apply_retention(RetentionPolicy::default(), &store, Some(&export));
        assert!(!store.exists());
        assert!(export.exists());
    }
}
