//! Recurring maintenance tasks
//!
//! Each registered task gets a background task that sleeps until the next
//! occurrence of its [`Recurrence`] and then enqueues
//! [`Event::Scheduled`](crate::event::Event::Scheduled). The work itself
//! runs on the event loop like any other callback.

pub mod recurrence;

pub use recurrence::Recurrence;

use crate::event::{Event, EventSender, Task};
use chrono::Local;
use tokio::task::JoinHandle;

/// Enqueue `task` at every occurrence of `rule`
pub fn spawn_recurring(task: Task, rule: Recurrence, events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = rule.next_after(now) else {
                tracing::warn!(task = ?task, rule = %rule, "Recurrence never comes due, not scheduling");
                break;
            };
            let delay = (next - now).to_std().unwrap_or_default();
            tracing::debug!(task = ?task, next = %next, "Next run scheduled");

            tokio::time::sleep(delay).await;

            if events.send(Event::Scheduled(task)).is_err() {
                break;
            }
        }
    })
}

/// Owns the recurring-task handles; dropping it cancels them
pub struct Scheduler {
    events: EventSender,
    tasks: Vec<(Task, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            tasks: Vec::new(),
        }
    }

    /// Register a recurring task
    pub fn schedule(&mut self, task: Task, rule: Recurrence) {
        tracing::info!(task = ?task, rule = %rule, "Scheduling task");
        let handle = spawn_recurring(task, rule, self.events.clone());
        self.tasks.push((task, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every registered task
    pub fn stop(&mut self) {
        for (task, handle) in self.tasks.drain(..) {
            handle.abort();
            tracing::debug!(task = ?task, "Scheduled task cancelled");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
