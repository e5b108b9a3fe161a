//! Reactive control layer
//!
//! - **io**: Relay outputs and the dashboard seam
//! - **timer**: Cancellable, generation-tagged tick timers
//! - **debounce**: Settle-window debouncing of physical inputs
//! - **recharge**: Well pressure-switch charge cycles
//! - **call_for_heat**: Thermostat call-for-heat counting and passthrough
//! - **duty_cycle**: Exclusive arbitration between the two valves
//!
//! Handlers never reach for shared globals: the store, the dashboard and
//! the event queue are lent to them through a [`Context`] for the duration
//! of one event.

pub mod call_for_heat;
pub mod debounce;
pub mod duty_cycle;
pub mod error;
pub mod io;
pub mod recharge;
pub mod timer;

pub use call_for_heat::CallForHeatMonitor;
pub use debounce::{spawn_debounced, Debouncer};
pub use duty_cycle::{DutyCycleController, Valve, ValveState};
pub use error::{ControlError, ControlResult};
pub use io::{Dashboard, Display, Indicator, OutputPin, Reading, Relay};
pub use recharge::{ChargeState, RechargeMonitor};
pub use timer::{Timer, TimerMode};

use crate::event::EventSender;
use crate::storage::TimeSeriesStore;

/// Collaborators lent to a handler for one event
pub struct Context<'a> {
    pub store: &'a mut TimeSeriesStore,
    pub dashboard: &'a mut dyn Dashboard,
    pub events: &'a EventSender,
}

impl<'a> Context<'a> {
    pub fn new(
        store: &'a mut TimeSeriesStore,
        dashboard: &'a mut dyn Dashboard,
        events: &'a EventSender,
    ) -> Self {
        Self {
            store,
            dashboard,
            events,
        }
    }
}
