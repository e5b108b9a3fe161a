//! Thermostat call-for-heat passthrough
//!
//! While the thermostat calls for heat the boiler-start relay and its
//! indicator are held on. Every rising edge is counted once in the store.

use crate::control::error::ControlResult;
use crate::control::io::{Display, Indicator, Reading, Relay};
use crate::control::Context;
use crate::event::Level;
use crate::storage::CFH_COUNTER;

#[derive(Debug)]
pub struct CallForHeatMonitor {
    relay: Relay,
    level: Level,
}

impl CallForHeatMonitor {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay,
            level: Level::Low,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut Relay {
        &mut self.relay
    }

    pub fn on_level(&mut self, level: Level, ctx: &mut Context<'_>) -> ControlResult<()> {
        if level == self.level {
            tracing::debug!(level = %level, "Duplicate thermostat edge ignored");
            return Ok(());
        }
        self.level = level;

        match level {
            Level::High => {
                self.relay.enable()?;
                ctx.dashboard.indicator(Indicator::ThermostatCallForHeat, true);

                let count = ctx.store.increment(CFH_COUNTER)?;
                ctx.dashboard.display(Display::CfhCounter, Reading::Number(count));
                tracing::info!(calls = count, "Thermostat calling for heat");
            }
            Level::Low => {
                self.relay.disable()?;
                ctx.dashboard.indicator(Indicator::ThermostatCallForHeat, false);
                tracing::info!("Thermostat satisfied");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::testing::Harness;
    use crate::sim::SimPin;

    fn monitor() -> (CallForHeatMonitor, SimPin) {
        let pin = SimPin::new("boiler start");
        let relay = Relay::new("boiler start", Box::new(pin.clone()), true);
        (CallForHeatMonitor::new(relay), pin)
    }

    #[test]
    fn test_rising_edges_are_counted() {
        let mut h = Harness::new();
        let (mut cfh, pin) = monitor();

        cfh.on_level(Level::High, &mut h.ctx()).unwrap();
        assert!(cfh.relay().is_active());
        assert_eq!(pin.level(), Some(Level::Low));
        assert!(h.dashboard.indicator_on(Indicator::ThermostatCallForHeat));
        assert_eq!(h.store.snapshot().counter(CFH_COUNTER), 1);

        cfh.on_level(Level::Low, &mut h.ctx()).unwrap();
        assert!(!cfh.relay().is_active());
        assert!(!h.dashboard.indicator_on(Indicator::ThermostatCallForHeat));

        cfh.on_level(Level::High, &mut h.ctx()).unwrap();
        assert_eq!(h.store.snapshot().counter(CFH_COUNTER), 2);
        assert_eq!(
            h.dashboard.reading(Display::CfhCounter),
            Some(Reading::Number(2))
        );
    }

    #[test]
    fn test_duplicate_high_is_noop() {
        let mut h = Harness::new();
        let (mut cfh, pin) = monitor();

        cfh.on_level(Level::High, &mut h.ctx()).unwrap();
        let writes = pin.writes();
        cfh.on_level(Level::High, &mut h.ctx()).unwrap();

        assert_eq!(pin.writes(), writes);
        assert_eq!(h.store.snapshot().counter(CFH_COUNTER), 1);
        assert_eq!(h.store.row_count(), 1);
    }

    #[test]
    fn test_initial_low_does_nothing() {
        let mut h = Harness::new();
        let (mut cfh, pin) = monitor();
        cfh.on_level(Level::Low, &mut h.ctx()).unwrap();
        assert_eq!(pin.writes(), 0);
        assert_eq!(h.store.row_count(), 0);
    }

    #[test]
    fn test_relay_fault_is_reported() {
        let mut h = Harness::new();
        let (mut cfh, pin) = monitor();
        pin.set_failing(true);

        let err = cfh.on_level(Level::High, &mut h.ctx()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(h.store.row_count(), 0);
    }
}
