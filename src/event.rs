//! Event vocabulary of the single execution queue
//!
//! Pin edges, dashboard writes, timer ticks and scheduled tasks all arrive as
//! [`Event`]s on one unbounded channel and are handled strictly one at a
//! time by the runtime loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Logical digital level of an input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Interpret a raw pin or widget value; anything but 1 is low
    pub fn from_raw(raw: i64) -> Self {
        if raw == 1 {
            Level::High
        } else {
            Level::Low
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Low
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// Every input the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Well pressure switch (physical, debounced)
    PressureSwitch,
    /// Boiler call-for-heat signal (physical, debounced)
    BoilerCallForHeat,
    /// Thermostat call-for-heat signal (physical, debounced)
    ThermostatCallForHeat,
    /// Dashboard master enable for manual control
    ManualOverride,
    /// Dashboard button requesting the well valve
    ManualWell,
    /// Dashboard button requesting the Columbia valve
    ManualColumbia,
}

impl Input {
    pub const ALL: [Input; 6] = [
        Input::PressureSwitch,
        Input::BoilerCallForHeat,
        Input::ThermostatCallForHeat,
        Input::ManualOverride,
        Input::ManualWell,
        Input::ManualColumbia,
    ];

    /// Physical pins need debouncing; dashboard widgets do not
    pub fn is_physical(self) -> bool {
        matches!(
            self,
            Input::PressureSwitch | Input::BoilerCallForHeat | Input::ThermostatCallForHeat
        )
    }
}

/// Identifies which timer a tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    Recharge,
    WellValve,
    ColumbiaValve,
    BoilerConfirm,
}

/// Recurring maintenance work on the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Append the latest snapshot to the CSV export
    Export,
    /// Archive and restart the store
    Rotate,
}

/// One callback on the execution queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A stable level change on an input
    Input { input: Input, level: Level },
    /// A timer fired; stale generations are ignored
    Tick { timer: TimerId, generation: u64 },
    /// A recurring task came due
    Scheduled(Task),
    /// Log the current snapshot and controller state
    Status,
    /// Stop the loop after de-energising outputs
    Shutdown,
}

impl Event {
    pub fn input(input: Input, level: Level) -> Self {
        Event::Input { input, level }
    }
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the execution queue
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
