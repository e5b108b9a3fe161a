//! Crash-safe file primitives
//!
//! The persisted store is replaced with write-to-temp-then-rename:
//! 1. Write to `<path>.tmp`
//! 2. fsync the temp file
//! 3. Rename over `<path>`
//! 4. fsync the parent directory
//!
//! Readers therefore see either the previous complete store or the new one,
//! never a partial write.

use crate::storage::error::{StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Sibling path used for staging a replacement of `path`
pub fn staging_path(path: &Path, tag: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(tag);
    path.with_file_name(name)
}

/// Syncs a directory so that created or renamed entries survive power loss
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(dir)?.sync_all()
}

fn sync_parent(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fsync_dir(parent).map_err(|e| StorageError::write(parent, e))
        }
        _ => Ok(()),
    }
}

/// Ensure a directory exists
pub fn ensure_dir(dir: &Path) -> StorageResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| StorageError::write(dir, e))
}

/// Write `bytes` to `path` without exposing a partially written file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let tmp_path = staging_path(path, "tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| StorageError::write(&tmp_path, e))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::write(&tmp_path, e))?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::write(path, e))?;
    sync_parent(path)
}

/// Read a file, treating absence and zero length alike as "nothing there"
pub fn read_if_present(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(None),
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::malformed(path, e.to_string())),
    }
}

/// Whether `path` is missing or empty
pub fn is_absent_or_empty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

/// Open a file for appending, creating it if needed
pub fn open_append(path: &Path) -> StorageResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::write(path, e))
}
