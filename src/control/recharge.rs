//! Well recharge monitoring
//!
//! The well pressure switch asserting starts a charge cycle. A periodic
//! timer advances the charge-level display once per tick; after
//! `threshold` ticks the well counts as charged, the timer stops and the
//! recharge counter is incremented exactly once.
//!
//! ```text
//! Idle ──assert──▶ Charging ──threshold ticks──▶ Charged ──de-assert──▶ Idle
//! ```
//!
//! Once begun, a cycle runs to completion even if the switch releases
//! early; it then settles in `Idle` instead of `Charged`.

use crate::control::error::ControlResult;
use crate::control::io::{Display, Reading};
use crate::control::timer::Timer;
use crate::control::Context;
use crate::event::{Level, TimerId};
use crate::storage::WELL_RECHARGE_COUNTER;
use std::time::Duration;

/// Charge cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Idle,
    Charging { ticks: u32 },
    Charged,
}

/// Debounced pressure-switch state machine
#[derive(Debug)]
pub struct RechargeMonitor {
    state: ChargeState,
    timer: Timer,
    threshold: u32,
    well_charged: bool,
    input: Level,
}

impl RechargeMonitor {
    pub fn new(threshold: u32, tick: Duration) -> Self {
        Self {
            state: ChargeState::Idle,
            timer: Timer::periodic(TimerId::Recharge, tick),
            threshold: threshold.max(1),
            well_charged: false,
            input: Level::Low,
        }
    }

    pub fn state(&self) -> ChargeState {
        self.state
    }

    /// Set when a cycle completes, cleared when the next one begins
    pub fn well_charged(&self) -> bool {
        self.well_charged
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// React to a settled pressure-switch level
    pub fn on_level(&mut self, level: Level, ctx: &mut Context<'_>) -> ControlResult<()> {
        self.input = level;

        match (level, self.state) {
            (Level::High, ChargeState::Idle) => {
                self.well_charged = false;
                self.state = ChargeState::Charging { ticks: 0 };
                self.timer.start(ctx.events);
                ctx.dashboard.display(Display::RechargeLevel, Reading::Number(0));
                tracing::info!(threshold = self.threshold, "Well recharge started");
            }
            (Level::High, state) => {
                tracing::debug!(state = ?state, "Pressure switch re-asserted, cycle already in progress");
            }
            (Level::Low, ChargeState::Charged) => {
                self.state = ChargeState::Idle;
                tracing::info!("Pressure switch released");
            }
            (Level::Low, _) => {}
        }
        Ok(())
    }

    /// Advance the charge cycle by one tick of `generation`
    pub fn on_tick(&mut self, generation: u64, ctx: &mut Context<'_>) -> ControlResult<()> {
        if !self.timer.accept(generation) {
            return Ok(());
        }
        let ChargeState::Charging { ticks } = self.state else {
            self.timer.stop();
            return Ok(());
        };

        let ticks = ticks + 1;
        ctx.dashboard
            .display(Display::RechargeLevel, Reading::Number(ticks as i64));

        if ticks < self.threshold {
            self.state = ChargeState::Charging { ticks };
            return Ok(());
        }

        self.timer.stop();
        self.well_charged = true;
        self.state = if self.input.is_high() {
            ChargeState::Charged
        } else {
            ChargeState::Idle
        };

        let count = ctx.store.increment(WELL_RECHARGE_COUNTER)?;
        ctx.dashboard
            .display(Display::RechargeCounter, Reading::Number(count));
        tracing::info!(recharges = count, "Well recharged");
        Ok(())
    }
}
