//! Storage layer error types
//!
//! Defines all errors that can occur while loading, appending to, exporting
//! or rotating the usage log.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No persisted store exists (recovered by creating an empty one)
    #[error("No persisted store at {0:?}")]
    MissingStore(PathBuf),

    /// Persisted bytes could not be parsed or violate the column invariants
    #[error("Malformed store {path:?}: {reason}")]
    MalformedStore { path: PathBuf, reason: String },

    /// A persisted write, rename or directory creation failed
    #[error("Write failed for {path:?}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rotation could neither complete nor be rolled back
    #[error("Rotation left {committed:?} committed but failed at {failed:?}: {reason}")]
    RotationPartialFailure {
        committed: Vec<PathBuf>,
        failed: PathBuf,
        reason: String,
    },

    /// Append named a field that is not in the mapping
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Append omitted a field of the mapping
    #[error("Missing value for field: {0}")]
    MissingField(String),

    /// Increment targeted a field whose value is not numeric
    #[error("Field {0} does not hold a counter")]
    NotACounter(String),

    /// Writing a row to the tabular export failed
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

impl StorageError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::WriteFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::MalformedStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the control loop must stop on this error
    ///
    /// Caller mistakes (bad field keys) leave the store untouched; everything
    /// touching persisted state is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StorageError::MissingStore(_)
                | StorageError::UnknownField(_)
                | StorageError::MissingField(_)
                | StorageError::NotACounter(_)
        )
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
