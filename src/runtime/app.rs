//! The controller and its event loop
//!
//! [`App`] owns the store, the dashboard, the three state machines and the
//! sending half of the execution queue. [`App::run`] pulls one event at a
//! time and lends the collaborators to the handler it belongs to, so no
//! two handlers ever run concurrently.

use crate::config::ControlConfig;
use crate::control::{
    CallForHeatMonitor, ChargeState, Context, ControlResult, Dashboard, Display,
    DutyCycleController, Indicator, OutputPin, Reading, RechargeMonitor, Relay, Valve,
};
use crate::event::{Event, EventReceiver, EventSender, Input, Level, Task, TimerId};
use crate::storage::{
    minutes_as_hours_mins, TimeSeriesStore, CFH_COUNTER, COLUMBIA_TIMER, WELL_RECHARGE_COUNTER,
    WELL_TIMER,
};

/// The three relay outputs
pub struct Outputs {
    pub well_valve: Box<dyn OutputPin>,
    pub columbia_valve: Box<dyn OutputPin>,
    pub boiler_start: Box<dyn OutputPin>,
}

/// Whether the loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Dual-source water heating controller
pub struct App {
    store: TimeSeriesStore,
    dashboard: Box<dyn Dashboard>,
    recharge: RechargeMonitor,
    call_for_heat: CallForHeatMonitor,
    duty_cycle: DutyCycleController,
    events: EventSender,
}

impl App {
    pub fn new(
        store: TimeSeriesStore,
        dashboard: Box<dyn Dashboard>,
        outputs: Outputs,
        control: &ControlConfig,
        events: EventSender,
    ) -> Self {
        let active_low = control.relays_active_low;
        let relay = |name, pin| Relay::new(name, pin, active_low);

        Self {
            store,
            dashboard,
            recharge: RechargeMonitor::new(control.recharge_ticks, control.tick_interval()),
            call_for_heat: CallForHeatMonitor::new(relay("boiler start", outputs.boiler_start)),
            duty_cycle: DutyCycleController::new(
                relay("well valve", outputs.well_valve),
                relay("columbia valve", outputs.columbia_valve),
                control.tick_interval(),
                control.boiler_confirm(),
            ),
            events,
        }
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn recharge(&self) -> &RechargeMonitor {
        &self.recharge
    }

    pub fn call_for_heat(&self) -> &CallForHeatMonitor {
        &self.call_for_heat
    }

    pub fn duty_cycle(&self) -> &DutyCycleController {
        &self.duty_cycle
    }

    /// A sender onto this controller's queue
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Drive every output to its resting state and seed the dashboard
    pub fn start(&mut self) -> ControlResult<()> {
        let Self {
            store,
            dashboard,
            call_for_heat,
            duty_cycle,
            events,
            ..
        } = self;
        let mut ctx = Context::new(store, &mut **dashboard, events);

        duty_cycle.deactivate_all(&mut ctx)?;
        call_for_heat.relay_mut().disable()?;

        for input in Input::ALL.into_iter().filter(|i| !i.is_physical()) {
            ctx.dashboard.write_input(input, Level::Low);
        }
        for indicator in [
            Indicator::UsingColumbia,
            Indicator::UsingWell,
            Indicator::ThermostatCallForHeat,
            Indicator::BoilerCallForHeat,
        ] {
            ctx.dashboard.indicator(indicator, false);
        }

        let snapshot = ctx.store.snapshot();
        let hours = |key: &str| Reading::Text(minutes_as_hours_mins(snapshot.counter(key)));
        ctx.dashboard.display(Display::RechargeLevel, Reading::Number(0));
        ctx.dashboard.display(
            Display::RechargeCounter,
            Reading::Number(snapshot.counter(WELL_RECHARGE_COUNTER)),
        );
        ctx.dashboard
            .display(Display::CfhCounter, Reading::Number(snapshot.counter(CFH_COUNTER)));
        ctx.dashboard.display(Display::WellTimer, hours(WELL_TIMER));
        ctx.dashboard.display(Display::ColumbiaTimer, hours(COLUMBIA_TIMER));

        tracing::info!(rows = ctx.store.row_count(), "Controller started");
        Ok(())
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: Event) -> ControlResult<Flow> {
        let Self {
            store,
            dashboard,
            recharge,
            call_for_heat,
            duty_cycle,
            events,
        } = self;
        let mut ctx = Context::new(store, &mut **dashboard, events);

        match event {
            Event::Input { input, level } => match input {
                Input::PressureSwitch => recharge.on_level(level, &mut ctx)?,
                Input::BoilerCallForHeat => duty_cycle.on_boiler(level, &mut ctx)?,
                Input::ThermostatCallForHeat => call_for_heat.on_level(level, &mut ctx)?,
                Input::ManualOverride => duty_cycle.on_override(level, &mut ctx)?,
                Input::ManualWell => duty_cycle.on_manual(Valve::Well, level, &mut ctx)?,
                Input::ManualColumbia => duty_cycle.on_manual(Valve::Columbia, level, &mut ctx)?,
            },
            Event::Tick { timer, generation } => match timer {
                TimerId::Recharge => recharge.on_tick(generation, &mut ctx)?,
                TimerId::WellValve => duty_cycle.on_valve_tick(Valve::Well, generation, &mut ctx)?,
                TimerId::ColumbiaValve => {
                    duty_cycle.on_valve_tick(Valve::Columbia, generation, &mut ctx)?
                }
                TimerId::BoilerConfirm => {
                    duty_cycle.on_boiler_confirmed(generation, recharge.well_charged(), &mut ctx)?
                }
            },
            Event::Scheduled(Task::Export) => {
                ctx.store.export_row()?;
                tracing::info!(path = ?ctx.store.export().path(), "Scheduled export written");
            }
            Event::Scheduled(Task::Rotate) => {
                let report = ctx.store.rotate()?;
                tracing::info!(
                    store_archive = ?report.store_archive,
                    export_archive = ?report.export_archive,
                    "Scheduled rotation complete"
                );
            }
            Event::Status => self.log_status(),
            Event::Shutdown => return Ok(Flow::Stop),
        }

        if !self.duty_cycle.is_exclusive() {
            tracing::error!("Both valves active");
        }
        Ok(Flow::Continue)
    }

    /// Process events until shutdown or a fatal error.
    ///
    /// Outputs are de-energised on the way out either way.
    pub async fn run(&mut self, mut rx: EventReceiver) -> ControlResult<()> {
        if let Err(e) = self.start() {
            tracing::error!(error = %e, "Failed to initialise outputs");
            self.shutdown();
            return Err(e);
        }

        while let Some(event) = rx.recv().await {
            tracing::trace!(event = ?event, "Event");
            match self.handle(event) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Fatal error, stopping controller");
                    self.shutdown();
                    return Err(e);
                }
                Err(e) => tracing::warn!(error = %e, "Event rejected"),
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Best-effort: close both valves and release the boiler relay
    pub fn shutdown(&mut self) {
        let Self {
            store,
            dashboard,
            call_for_heat,
            duty_cycle,
            events,
            ..
        } = self;
        let mut ctx = Context::new(store, &mut **dashboard, events);

        if let Err(e) = duty_cycle.deactivate_all(&mut ctx) {
            tracing::warn!(error = %e, "Failed to close valves");
        }
        if let Err(e) = call_for_heat.relay_mut().disable() {
            tracing::warn!(error = %e, "Failed to release boiler relay");
        }
        tracing::info!("Outputs de-energised");
    }

    fn log_status(&self) {
        let snapshot = self.store.snapshot();
        let fields: Vec<String> = snapshot
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();

        let charge = match self.recharge.state() {
            ChargeState::Idle => "idle".to_string(),
            ChargeState::Charging { ticks } => format!("charging ({})", ticks),
            ChargeState::Charged => "charged".to_string(),
        };

        tracing::info!(
            valves = ?self.duty_cycle.state(),
            override_enabled = self.duty_cycle.master_enabled(),
            recharge = %charge,
            well_charged = self.recharge.well_charged(),
            thermostat = %self.call_for_heat.level(),
            rows = self.store.row_count(),
            snapshot = %fields.join(", "),
            "Status"
        );
    }
}
