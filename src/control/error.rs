//! Control layer error types

use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised while reacting to an event
#[derive(Error, Debug)]
pub enum ControlError {
    /// The usage log rejected an operation
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A relay output could not be driven
    #[error("Output {name} failed: {source}")]
    Output {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ControlError {
    /// Whether the control loop must stop
    ///
    /// Unknown persisted state or an undrivable relay makes further valve
    /// switching unsafe.
    pub fn is_fatal(&self) -> bool {
        match self {
            ControlError::Storage(e) => e.is_fatal(),
            ControlError::Output { .. } => true,
        }
    }
}

/// Result type for control operations
pub type ControlResult<T> = Result<T, ControlError>;
