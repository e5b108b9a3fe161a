//! Tick timers
//!
//! A [`Timer`] is either stopped or running. Running owns the spawned tick
//! task, so stopping aborts it. Every start gets a fresh generation and each
//! tick carries the generation it was sent with; a tick already queued when
//! the timer was stopped or restarted no longer matches and is dropped by
//! [`Timer::accept`].

use crate::event::{Event, EventSender, TimerId};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Whether a timer repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Tick every period until stopped
    Periodic,
    /// Tick once after the period, then stop
    Once,
}

#[derive(Debug)]
enum TimerState {
    Stopped,
    Running { generation: u64, handle: JoinHandle<()> },
}

/// A cancellable tick source feeding the execution queue
#[derive(Debug)]
pub struct Timer {
    id: TimerId,
    period: Duration,
    mode: TimerMode,
    state: TimerState,
    generations: u64,
}

impl Timer {
    pub fn periodic(id: TimerId, period: Duration) -> Self {
        Self::new(id, period, TimerMode::Periodic)
    }

    pub fn once(id: TimerId, delay: Duration) -> Self {
        Self::new(id, delay, TimerMode::Once)
    }

    fn new(id: TimerId, period: Duration, mode: TimerMode) -> Self {
        Self {
            id,
            period,
            mode,
            state: TimerState::Stopped,
            generations: 0,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Generation of the running timer
    pub fn generation(&self) -> Option<u64> {
        match self.state {
            TimerState::Running { generation, .. } => Some(generation),
            TimerState::Stopped => None,
        }
    }

    /// Start ticking; a no-op returning `false` if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, events: &EventSender) -> bool {
        if self.is_running() {
            return false;
        }

        self.generations += 1;
        let generation = self.generations;
        let handle = spawn_ticks(self.id, generation, self.period, self.mode, events.clone());
        self.state = TimerState::Running { generation, handle };

        tracing::trace!(timer = ?self.id, generation, "Timer started");
        true
    }

    /// Stop, then start with a fresh generation
    pub fn restart(&mut self, events: &EventSender) {
        self.stop();
        self.start(events);
    }

    /// Stop ticking; returns `false` if it was not running
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, TimerState::Stopped) {
            TimerState::Running { generation, handle } => {
                handle.abort();
                tracing::trace!(timer = ?self.id, generation, "Timer stopped");
                true
            }
            TimerState::Stopped => false,
        }
    }

    /// Whether a tick of `generation` should be acted on.
    ///
    /// A one-shot timer returns to stopped once its tick is accepted.
    pub fn accept(&mut self, generation: u64) -> bool {
        if self.generation() != Some(generation) {
            tracing::debug!(timer = ?self.id, generation, "Ignoring stale tick");
            return false;
        }
        if self.mode == TimerMode::Once {
            self.stop();
        }
        true
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_ticks(
    timer: TimerId,
    generation: u64,
    period: Duration,
    mode: TimerMode,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match mode {
            TimerMode::Once => {
                tokio::time::sleep(period).await;
                let _ = events.send(Event::Tick { timer, generation });
            }
            TimerMode::Periodic => {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if events.send(Event::Tick { timer, generation }).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
