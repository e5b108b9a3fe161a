//! Wellswitch Storage
//!
//! This module provides the persisted usage log:
//!
//! - **types**: Core data structures (Value, FieldMapping, Snapshot)
//! - **columns**: The in-memory columnar store and its JSON form
//! - **persist**: Crash-safe write and rename primitives
//! - **export**: The append-only CSV export
//! - **archive**: Dated archives and all-or-nothing rotation
//! - **engine**: `TimeSeriesStore`, orchestrating all of the above
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Append:   values → Columns (+1 row) → Data.json (temp + rename)
//! Export:   Snapshot → "H:MM" formatting → Data.csv (append)
//! Rotate:   stage fresh files → rename live → archive/ → promote staged
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use wellswitch::storage::{FieldMapping, StoreConfig, TimeSeriesStore, WELL_TIMER};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::new("./data");
//!     let mut store = TimeSeriesStore::initialize(config, FieldMapping::standard(), false)?;
//!
//!     store.increment(WELL_TIMER)?;
//!     store.export_row()?;
//!
//!     println!("Well timer: {}", store.snapshot().counter(WELL_TIMER));
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod columns;
pub mod engine;
pub mod error;
pub mod export;
pub mod persist;
pub mod types;

// Re-export commonly used types
pub use archive::{archive_name, RenamePlan, RetentionPolicy};
pub use columns::{Column, Columns};
pub use engine::{RotationReport, StoreConfig, TimeSeriesStore, DEFAULT_TIMESTAMP_FORMAT};
pub use error::{StorageError, StorageResult};
pub use export::{format_row, TabularExport};
pub use types::{
    minutes_as_hours_mins, Field, FieldKind, FieldMapping, Snapshot, Value, CFH_COUNTER,
    COLUMBIA_TIMER, DATE, WELL_RECHARGE_COUNTER, WELL_TIMER,
};
