//! Valve arbitration between the well and the Columbia supply
//!
//! At most one valve relay is energised at a time. Every activation goes
//! through [`DutyCycleController::activate`], which tears the other valve
//! down (timer, relay, indicator) before bringing the requested one up, so
//! both relays are never active together even between two writes.
//!
//! ```text
//!                 manual / boiler            manual / boiler
//!   WellActive ◀──────────────── Inactive ────────────────▶ ColumbiaActive
//!        │                          ▲                             │
//!        └──── override off / release ─────────────────────────────┘
//! ```
//!
//! While a valve is active its timer adds one to the valve's duration
//! field per tick.

use crate::control::error::ControlResult;
use crate::control::io::{Display, Indicator, Reading, Relay};
use crate::control::timer::Timer;
use crate::control::Context;
use crate::event::{Input, Level, TimerId};
use crate::storage::{minutes_as_hours_mins, COLUMBIA_TIMER, WELL_TIMER};
use std::fmt;
use std::time::Duration;

/// One of the two supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Valve {
    Well,
    Columbia,
}

impl Valve {
    pub fn other(self) -> Valve {
        match self {
            Valve::Well => Valve::Columbia,
            Valve::Columbia => Valve::Well,
        }
    }

    pub fn timer_id(self) -> TimerId {
        match self {
            Valve::Well => TimerId::WellValve,
            Valve::Columbia => TimerId::ColumbiaValve,
        }
    }
}

impl fmt::Display for Valve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valve::Well => f.write_str("well"),
            Valve::Columbia => f.write_str("columbia"),
        }
    }
}

/// Which valve currently owns the supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Inactive,
    WellActive,
    ColumbiaActive,
}

impl ValveState {
    pub fn active(self) -> Option<Valve> {
        match self {
            ValveState::Inactive => None,
            ValveState::WellActive => Some(Valve::Well),
            ValveState::ColumbiaActive => Some(Valve::Columbia),
        }
    }

    fn of(valve: Valve) -> Self {
        match valve {
            Valve::Well => ValveState::WellActive,
            Valve::Columbia => ValveState::ColumbiaActive,
        }
    }
}

/// Everything bound to one valve
#[derive(Debug)]
struct ValveChannel {
    relay: Relay,
    timer: Timer,
    field: &'static str,
    display: Display,
    indicator: Indicator,
    button: Input,
}

impl ValveChannel {
    fn new(valve: Valve, relay: Relay, tick: Duration) -> Self {
        let (field, display, indicator, button) = match valve {
            Valve::Well => (
                WELL_TIMER,
                Display::WellTimer,
                Indicator::UsingWell,
                Input::ManualWell,
            ),
            Valve::Columbia => (
                COLUMBIA_TIMER,
                Display::ColumbiaTimer,
                Indicator::UsingColumbia,
                Input::ManualColumbia,
            ),
        };
        Self {
            relay,
            timer: Timer::periodic(valve.timer_id(), tick),
            field,
            display,
            indicator,
            button,
        }
    }

    fn shut(&mut self, ctx: &mut Context<'_>) -> ControlResult<()> {
        self.timer.stop();
        self.relay.disable()?;
        ctx.dashboard.indicator(self.indicator, false);
        Ok(())
    }
}

/// Exclusive valve state machine
#[derive(Debug)]
pub struct DutyCycleController {
    well: ValveChannel,
    columbia: ValveChannel,
    state: ValveState,
    master_enabled: bool,
    boiler_confirm: Timer,
}

impl DutyCycleController {
    pub fn new(
        well_relay: Relay,
        columbia_relay: Relay,
        tick: Duration,
        boiler_confirm: Duration,
    ) -> Self {
        Self {
            well: ValveChannel::new(Valve::Well, well_relay, tick),
            columbia: ValveChannel::new(Valve::Columbia, columbia_relay, tick),
            state: ValveState::Inactive,
            master_enabled: false,
            boiler_confirm: Timer::once(TimerId::BoilerConfirm, boiler_confirm),
        }
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn master_enabled(&self) -> bool {
        self.master_enabled
    }

    pub fn relay(&self, valve: Valve) -> &Relay {
        &self.channel(valve).relay
    }

    pub fn timer(&self, valve: Valve) -> &Timer {
        &self.channel(valve).timer
    }

    pub fn boiler_confirm(&self) -> &Timer {
        &self.boiler_confirm
    }

    /// Neither relay is energised together with the other
    pub fn is_exclusive(&self) -> bool {
        !(self.well.relay.is_active() && self.columbia.relay.is_active())
    }

    fn channel(&self, valve: Valve) -> &ValveChannel {
        match valve {
            Valve::Well => &self.well,
            Valve::Columbia => &self.columbia,
        }
    }

    fn channels(&mut self, valve: Valve) -> (&mut ValveChannel, &mut ValveChannel) {
        match valve {
            Valve::Well => (&mut self.well, &mut self.columbia),
            Valve::Columbia => (&mut self.columbia, &mut self.well),
        }
    }

    /// Manual override switch
    pub fn on_override(&mut self, level: Level, ctx: &mut Context<'_>) -> ControlResult<()> {
        self.master_enabled = level.is_high();
        tracing::info!(enabled = self.master_enabled, "Manual override");

        if !self.master_enabled {
            ctx.dashboard.write_input(self.well.button, Level::Low);
            ctx.dashboard.write_input(self.columbia.button, Level::Low);
            self.deactivate_all(ctx)?;
        }
        Ok(())
    }

    /// Manual valve button
    pub fn on_manual(
        &mut self,
        valve: Valve,
        level: Level,
        ctx: &mut Context<'_>,
    ) -> ControlResult<()> {
        if !self.master_enabled {
            tracing::debug!(valve = %valve, "Manual request without override, resetting button");
            ctx.dashboard
                .write_input(self.channel(valve).button, Level::Low);
            return Ok(());
        }

        match level {
            Level::High => {
                let other = self.channel(valve.other()).button;
                ctx.dashboard.write_input(other, Level::Low);
                self.activate(valve, ctx)
            }
            Level::Low => self.deactivate_all(ctx),
        }
    }

    /// Boiler call-for-heat input
    ///
    /// An assertion arms the confirmation delay; a de-assertion cancels it.
    pub fn on_boiler(&mut self, level: Level, ctx: &mut Context<'_>) -> ControlResult<()> {
        match level {
            Level::High => {
                self.boiler_confirm.restart(ctx.events);
                tracing::debug!("Boiler call for heat, awaiting confirmation");
            }
            Level::Low => {
                self.boiler_confirm.stop();
                ctx.dashboard.indicator(Indicator::BoilerCallForHeat, false);
                tracing::info!("Boiler call for heat cleared");
            }
        }
        Ok(())
    }

    /// The confirmation delay elapsed with the boiler still calling
    pub fn on_boiler_confirmed(
        &mut self,
        generation: u64,
        well_charged: bool,
        ctx: &mut Context<'_>,
    ) -> ControlResult<()> {
        if !self.boiler_confirm.accept(generation) {
            return Ok(());
        }
        ctx.dashboard.indicator(Indicator::BoilerCallForHeat, true);

        let valve = if well_charged {
            Valve::Well
        } else {
            Valve::Columbia
        };
        tracing::info!(valve = %valve, well_charged, "Boiler confirmed, selecting supply");
        self.activate(valve, ctx)
    }

    /// One duty-cycle tick of `valve`'s timer
    pub fn on_valve_tick(
        &mut self,
        valve: Valve,
        generation: u64,
        ctx: &mut Context<'_>,
    ) -> ControlResult<()> {
        let state = self.state;
        let channel = match valve {
            Valve::Well => &mut self.well,
            Valve::Columbia => &mut self.columbia,
        };
        if !channel.timer.accept(generation) {
            return Ok(());
        }
        if state.active() != Some(valve) {
            tracing::warn!(valve = %valve, state = ?state, "Tick for inactive valve");
            channel.timer.stop();
            return Ok(());
        }

        let total = ctx.store.increment(channel.field)?;
        ctx.dashboard
            .display(channel.display, Reading::Text(minutes_as_hours_mins(total)));
        Ok(())
    }

    /// Make `valve` the only active valve
    pub fn activate(&mut self, valve: Valve, ctx: &mut Context<'_>) -> ControlResult<()> {
        let (this, other) = self.channels(valve);

        if other.relay.is_active() || other.timer.is_running() {
            tracing::info!(valve = %valve.other(), "Stopping valve");
        }
        other.shut(ctx)?;

        this.relay.enable()?;
        ctx.dashboard.indicator(this.indicator, true);
        if this.timer.start(ctx.events) {
            tracing::info!(valve = %valve, "Valve active");
        }

        self.state = ValveState::of(valve);
        Ok(())
    }

    /// Close both valves and stop both timers
    pub fn deactivate_all(&mut self, ctx: &mut Context<'_>) -> ControlResult<()> {
        let was = self.state;
        self.state = ValveState::Inactive;
        self.well.shut(ctx)?;
        self.columbia.shut(ctx)?;

        if was != ValveState::Inactive {
            tracing::info!(was = ?was, "Valves closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::testing::Harness;
    use crate::sim::SimPin;

    struct Rig {
        h: Harness,
        dc: DutyCycleController,
        well: SimPin,
        columbia: SimPin,
    }

    fn rig() -> Rig {
        let well = SimPin::new("well valve");
        let columbia = SimPin::new("columbia valve");
        let dc = DutyCycleController::new(
            Relay::new("well valve", Box::new(well.clone()), true),
            Relay::new("columbia valve", Box::new(columbia.clone()), true),
            Duration::from_secs(1),
            Duration::from_millis(100),
        );
        Rig {
            h: Harness::new(),
            dc,
            well,
            columbia,
        }
    }

    impl Rig {
        fn tick(&mut self, valve: Valve) {
            let generation = self.dc.timer(valve).generation().expect("timer running");
            self.dc
                .on_valve_tick(valve, generation, &mut self.h.ctx())
                .unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_switching_is_exclusive() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();

        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::WellActive);
        assert_eq!(r.well.level(), Some(Level::Low));
        assert!(r.dc.is_exclusive());

        r.dc.on_manual(Valve::Columbia, Level::High, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::ColumbiaActive);
        assert!(!r.dc.relay(Valve::Well).is_active());
        assert!(r.dc.relay(Valve::Columbia).is_active());
        assert!(!r.dc.timer(Valve::Well).is_running());
        assert!(r.dc.timer(Valve::Columbia).is_running());
        assert_eq!(r.well.level(), Some(Level::High));
        assert_eq!(r.columbia.level(), Some(Level::Low));
        assert!(!r.h.dashboard.indicator_on(Indicator::UsingWell));
        assert!(r.h.dashboard.indicator_on(Indicator::UsingColumbia));
        assert_eq!(r.h.dashboard.input_level(Input::ManualWell), Some(Level::Low));
        assert!(r.dc.is_exclusive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_ignored_without_override() {
        let mut r = rig();
        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();

        assert_eq!(r.dc.state(), ValveState::Inactive);
        assert_eq!(r.well.writes(), 0);
        assert_eq!(r.h.dashboard.input_level(Input::ManualWell), Some(Level::Low));
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_off_stops_everything() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();
        let stale = r.dc.timer(Valve::Well).generation().unwrap();

        r.dc.on_override(Level::Low, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::Inactive);
        assert!(!r.dc.master_enabled());
        assert!(!r.dc.relay(Valve::Well).is_active());
        assert!(!r.dc.relay(Valve::Columbia).is_active());
        assert!(!r.dc.timer(Valve::Well).is_running());
        assert!(!r.dc.timer(Valve::Columbia).is_running());
        assert_eq!(r.h.dashboard.input_level(Input::ManualColumbia), Some(Level::Low));

        // A tick queued before the override dropped changes nothing
        r.dc.on_valve_tick(Valve::Well, stale, &mut r.h.ctx()).unwrap();
        assert_eq!(r.h.store.row_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_closes_both_valves() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Columbia, Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Columbia, Level::Low, &mut r.h.ctx()).unwrap();

        assert_eq!(r.dc.state(), ValveState::Inactive);
        assert_eq!(r.columbia.level(), Some(Level::High));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_accumulate_duration() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();

        for _ in 0..65 {
            r.tick(Valve::Well);
        }
        let snapshot = r.h.store.snapshot();
        assert_eq!(snapshot.counter(WELL_TIMER), 65);
        assert_eq!(snapshot.counter(COLUMBIA_TIMER), 0);
        assert_eq!(
            r.h.dashboard.reading(Display::WellTimer),
            Some(Reading::Text("1:05".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactivation_keeps_timer() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();
        let generation = r.dc.timer(Valve::Well).generation();

        r.dc.activate(Valve::Well, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.timer(Valve::Well).generation(), generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boiler_selects_by_charge() {
        let mut r = rig();

        r.dc.on_boiler(Level::High, &mut r.h.ctx()).unwrap();
        assert!(r.dc.boiler_confirm().is_running());
        assert_eq!(r.dc.state(), ValveState::Inactive);

        let generation = r.dc.boiler_confirm().generation().unwrap();
        r.dc.on_boiler_confirmed(generation, true, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::WellActive);
        assert!(r.h.dashboard.indicator_on(Indicator::BoilerCallForHeat));

        r.dc.on_boiler(Level::High, &mut r.h.ctx()).unwrap();
        let generation = r.dc.boiler_confirm().generation().unwrap();
        r.dc.on_boiler_confirmed(generation, false, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::ColumbiaActive);
        assert!(r.dc.is_exclusive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boiler_release_cancels_confirmation() {
        let mut r = rig();
        r.dc.on_boiler(Level::High, &mut r.h.ctx()).unwrap();
        let generation = r.dc.boiler_confirm().generation().unwrap();

        r.dc.on_boiler(Level::Low, &mut r.h.ctx()).unwrap();
        assert!(!r.dc.boiler_confirm().is_running());
        assert!(!r.h.dashboard.indicator_on(Indicator::BoilerCallForHeat));

        r.dc.on_boiler_confirmed(generation, true, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_disable_never_enables_other() {
        let mut r = rig();
        r.dc.on_override(Level::High, &mut r.h.ctx()).unwrap();
        r.dc.on_manual(Valve::Well, Level::High, &mut r.h.ctx()).unwrap();

        r.well.set_failing(true);
        let err = r
            .dc
            .on_manual(Valve::Columbia, Level::High, &mut r.h.ctx())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!r.dc.relay(Valve::Columbia).is_active());
        assert!(r.dc.is_exclusive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_fires_through_queue() {
        let mut r = rig();
        r.dc.on_boiler(Level::High, &mut r.h.ctx()).unwrap();

        let generation = match r.h.rx.recv().await.unwrap() {
            crate::event::Event::Tick {
                timer: TimerId::BoilerConfirm,
                generation,
            } => generation,
            other => panic!("expected a confirmation tick, got {:?}", other),
        };
        r.dc.on_boiler_confirmed(generation, false, &mut r.h.ctx()).unwrap();
        assert_eq!(r.dc.state(), ValveState::ColumbiaActive);
    }
}
