//! # Wellswitch
//!
//! Dual-source water heating controller. Hot water comes either from a
//! well-fed supply or from the Columbia supply; the controller decides which
//! valve is open, never both, and keeps a persistent usage log.
//!
//! ## Features
//!
//! - **Valve arbitration**: Manual override buttons and automatic selection
//!   on a confirmed boiler call for heat
//! - **Recharge monitoring**: Well pressure-switch charge cycles and counts
//! - **Call-for-heat passthrough**: Thermostat drives the boiler-start relay
//! - **Usage log**: Columnar JSON store with CSV export and dated archives
//! - **Recurring tasks**: Typed daily/monthly export and rotation schedule
//!
//! ## Modules
//!
//! - [`storage`]: The time-series store
//! - [`control`]: Timers, debouncing and the three state machines
//! - [`runtime`]: The single-queue event loop and console input
//! - [`schedule`]: Recurrence rules and the recurring-task scheduler
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wellswitch::event::channel;
//! use wellswitch::runtime::{App, Outputs};
//! use wellswitch::sim::{SimDashboard, SimPin};
//! use wellswitch::storage::{FieldMapping, StoreConfig, TimeSeriesStore};
//! use wellswitch::Config;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let store = TimeSeriesStore::initialize(
//!         config.storage.store_config(),
//!         FieldMapping::standard(),
//!         false,
//!     )?;
//!
//!     let (events, rx) = channel();
//!     let outputs = Outputs {
//!         well_valve: Box::new(SimPin::new("well")),
//!         columbia_valve: Box::new(SimPin::new("columbia")),
//!         boiler_start: Box::new(SimPin::new("boiler")),
//!     };
//!     let mut app = App::new(
//!         store,
//!         Box::new(SimDashboard::new()),
//!         outputs,
//!         &config.control,
//!         events,
//!     );
//!
//!     app.run(rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod control;
pub mod event;
pub mod logging;
pub mod runtime;
pub mod schedule;
pub mod sim;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Field, FieldKind, FieldMapping, RetentionPolicy, RotationReport, Snapshot, StorageError,
    StorageResult, StoreConfig, TimeSeriesStore, Value,
};

pub use control::{
    CallForHeatMonitor, ChargeState, ControlError, ControlResult, Dashboard, DutyCycleController,
    OutputPin, RechargeMonitor, Relay, Timer, Valve, ValveState,
};

pub use event::{Event, EventReceiver, EventSender, Input, Level, Task};

pub use runtime::{App, InputRouter, Outputs};

pub use schedule::{Recurrence, Scheduler};

pub use config::{Config, ConfigError, ControlConfig, LoggingConfig, ScheduleConfig};
