//! Debounce and edge detection for physical inputs
//!
//! Raw pin notifications bounce. A [`Debouncer`] reports a level only once
//! it has held for the settle window and differs from the last reported
//! level, so monitors see clean, alternating edges.

use crate::event::{Event, EventSender, Input, Level};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Settle-window debouncer
#[derive(Debug, Clone)]
pub struct Debouncer {
    settle: Duration,
    stable: Level,
    pending: Option<(Level, Instant)>,
}

impl Debouncer {
    pub fn new(settle: Duration, initial: Level) -> Self {
        Self {
            settle,
            stable: initial,
            pending: None,
        }
    }

    /// Last reported level
    pub fn stable(&self) -> Level {
        self.stable
    }

    /// Record a raw sample; returns a level change if one is already settled
    pub fn observe(&mut self, level: Level, now: Instant) -> Option<Level> {
        if level == self.stable {
            // Bounced back before settling
            self.pending = None;
            return None;
        }
        match self.pending {
            Some((pending, _)) if pending == level => {}
            _ => self.pending = Some((level, now)),
        }
        self.poll(now)
    }

    /// Report the pending level if it has held for the settle window
    pub fn poll(&mut self, now: Instant) -> Option<Level> {
        let (level, since) = self.pending?;
        if now.saturating_duration_since(since) < self.settle {
            return None;
        }
        self.pending = None;
        self.stable = level;
        Some(level)
    }

    /// When the pending level will have settled
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, since)| since + self.settle)
    }
}

/// Debounce a raw level stream and forward settled edges as input events
pub fn spawn_debounced(
    input: Input,
    settle: Duration,
    mut raw: mpsc::UnboundedReceiver<Level>,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(settle, Level::Low);

        loop {
            let settled = match debouncer.deadline() {
                Some(deadline) => tokio::select! {
                    sample = raw.recv() => match sample {
                        Some(level) => debouncer.observe(level, Instant::now()),
                        None => break,
                    },
                    _ = tokio::time::sleep_until(deadline) => debouncer.poll(Instant::now()),
                },
                None => match raw.recv().await {
                    Some(level) => debouncer.observe(level, Instant::now()),
                    None => break,
                },
            };

            if let Some(level) = settled {
                tracing::debug!(input = ?input, level = %level, "Input settled");
                if events.send(Event::input(input, level)).is_err() {
                    break;
                }
            }
        }

        tracing::debug!(input = ?input, "Input stream closed");
    })
}
