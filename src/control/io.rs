//! Seams to the physical outputs and the remote dashboard
//!
//! Pin access and dashboard rendering live outside this crate; the control
//! layer only sees [`OutputPin`] and [`Dashboard`].

use crate::control::error::{ControlError, ControlResult};
use crate::event::{Input, Level};
use std::fmt;
use std::io;

/// A synchronous, idempotent digital output
pub trait OutputPin {
    fn write(&mut self, level: Level) -> io::Result<()>;
}

/// Numeric and text display widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Display {
    RechargeLevel,
    RechargeCounter,
    ColumbiaTimer,
    WellTimer,
    CfhCounter,
}

/// Boolean indicator widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    UsingColumbia,
    UsingWell,
    ThermostatCallForHeat,
    BoilerCallForHeat,
}

/// What a display widget shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    Number(i64),
    Text(String),
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{}", n),
            Reading::Text(s) => f.write_str(s),
        }
    }
}

/// Write-only remote dashboard
///
/// Updates are best effort; an implementation absorbs its own delivery
/// failures.
pub trait Dashboard {
    fn display(&mut self, display: Display, reading: Reading);

    fn indicator(&mut self, indicator: Indicator, on: bool);

    /// Force an input widget to a level (e.g. bounce a button back to 0)
    fn write_input(&mut self, input: Input, level: Level);
}

/// A relay with its energising polarity and last commanded state
pub struct Relay {
    name: &'static str,
    pin: Box<dyn OutputPin>,
    active_low: bool,
    active: bool,
}

impl Relay {
    pub fn new(name: &'static str, pin: Box<dyn OutputPin>, active_low: bool) -> Self {
        Self {
            name,
            pin,
            active_low,
            active: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enable(&mut self) -> ControlResult<()> {
        self.drive(true)
    }

    pub fn disable(&mut self) -> ControlResult<()> {
        self.drive(false)
    }

    fn drive(&mut self, active: bool) -> ControlResult<()> {
        let level = match (active, self.active_low) {
            (true, true) | (false, false) => Level::Low,
            (true, false) | (false, true) => Level::High,
        };
        self.pin.write(level).map_err(|source| ControlError::Output {
            name: self.name,
            source,
        })?;
        self.active = active;
        Ok(())
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("name", &self.name)
            .field("active_low", &self.active_low)
            .field("active", &self.active)
            .finish()
    }
}
