//! Simulated collaborators
//!
//! In-memory stand-ins for the relay pins and the remote dashboard. The
//! daemon runs on them when no hardware bridge is attached, and tests use
//! them to observe what the controller drove. Clones share state, so a
//! handle kept outside the controller sees every write.

use crate::control::io::{Dashboard, Display, Indicator, OutputPin, Reading};
use crate::event::{Input, Level};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

/// An output pin that remembers its last level
#[derive(Debug, Clone)]
pub struct SimPin {
    name: &'static str,
    level: Rc<Cell<Option<Level>>>,
    writes: Rc<Cell<usize>>,
    failing: Rc<Cell<bool>>,
    failing_level: Rc<Cell<Option<Level>>>,
}

impl SimPin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            level: Rc::new(Cell::new(None)),
            writes: Rc::new(Cell::new(0)),
            failing: Rc::new(Cell::new(false)),
            failing_level: Rc::new(Cell::new(None)),
        }
    }

    /// Last written level, `None` before the first write
    pub fn level(&self) -> Option<Level> {
        self.level.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Make subsequent writes fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Make writes of `level` fail while other writes go through
    pub fn fail_on(&self, level: Option<Level>) {
        self.failing_level.set(level);
    }
}

impl OutputPin for SimPin {
    fn write(&mut self, level: Level) -> io::Result<()> {
        if self.failing.get() || self.failing_level.get() == Some(level) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("simulated fault on {}", self.name),
            ));
        }
        tracing::trace!(pin = self.name, level = %level, "Pin write");
        self.level.set(Some(level));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Everything the dashboard currently shows
#[derive(Debug, Default)]
struct DashboardState {
    displays: HashMap<Display, Reading>,
    indicators: HashMap<Indicator, bool>,
    inputs: HashMap<Input, Level>,
}

/// A dashboard that keeps widget state in memory and logs updates
#[derive(Debug, Clone, Default)]
pub struct SimDashboard {
    state: Rc<RefCell<DashboardState>>,
}

impl SimDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&self, display: Display) -> Option<Reading> {
        self.state.borrow().displays.get(&display).cloned()
    }

    pub fn indicator_on(&self, indicator: Indicator) -> bool {
        self.state
            .borrow()
            .indicators
            .get(&indicator)
            .copied()
            .unwrap_or(false)
    }

    pub fn input_level(&self, input: Input) -> Option<Level> {
        self.state.borrow().inputs.get(&input).copied()
    }
}

impl Dashboard for SimDashboard {
    fn display(&mut self, widget: Display, reading: Reading) {
        tracing::debug!(widget = ?widget, reading = %reading, "Display");
        self.state.borrow_mut().displays.insert(widget, reading);
    }

    fn indicator(&mut self, indicator: Indicator, on: bool) {
        tracing::debug!(indicator = ?indicator, on, "Indicator");
        self.state.borrow_mut().indicators.insert(indicator, on);
    }

    fn write_input(&mut self, input: Input, level: Level) {
        tracing::debug!(input = ?input, level = %level, "Input widget");
        self.state.borrow_mut().inputs.insert(input, level);
    }
}
