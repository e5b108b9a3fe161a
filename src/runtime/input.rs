//! Operator console and input routing
//!
//! Without a pin bridge the daemon takes its inputs as text lines, e.g.
//! `pressure 1`, `override 0`, `export`. Physical inputs go through a
//! debouncer task first; dashboard inputs are queued directly.

use crate::control::spawn_debounced;
use crate::event::{Event, EventSender, Input, Level, Task};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { input: Input, level: Level },
    Run(Task),
    Status,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("{0} needs a level (0 or 1)")]
    MissingLevel(String),

    #[error("Invalid level: {0}")]
    InvalidLevel(String),
}

fn input_named(name: &str) -> Option<Input> {
    let input = match name {
        "pressure" => Input::PressureSwitch,
        "boiler" => Input::BoilerCallForHeat,
        "thermostat" => Input::ThermostatCallForHeat,
        "override" => Input::ManualOverride,
        "well" => Input::ManualWell,
        "columbia" => Input::ManualColumbia,
        _ => return None,
    };
    Some(input)
}

fn parse_level(raw: &str) -> Result<Level, CommandError> {
    match raw {
        "on" | "high" => Ok(Level::High),
        "off" | "low" => Ok(Level::Low),
        _ => raw
            .parse::<i64>()
            .map(Level::from_raw)
            .map_err(|_| CommandError::InvalidLevel(raw.to_string())),
    }
}

/// Parse a console line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let lowered = line.to_ascii_lowercase();
    let mut words = lowered.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let command = match head {
        "export" => Command::Run(Task::Export),
        "rotate" => Command::Run(Task::Rotate),
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        name => {
            let input = input_named(name).ok_or_else(|| CommandError::Unknown(name.to_string()))?;
            let level = words
                .next()
                .ok_or_else(|| CommandError::MissingLevel(name.to_string()))
                .and_then(parse_level)?;
            Command::Set { input, level }
        }
    };
    Ok(Some(command))
}

/// Delivers input levels to the queue, debouncing physical pins
pub struct InputRouter {
    events: EventSender,
    raw: HashMap<Input, mpsc::UnboundedSender<Level>>,
    tasks: Vec<JoinHandle<()>>,
}

impl InputRouter {
    /// Spawn a debouncer per physical input
    pub fn new(events: EventSender, settle: Duration) -> Self {
        let mut raw = HashMap::new();
        let mut tasks = Vec::new();

        for input in Input::ALL.into_iter().filter(|i| i.is_physical()) {
            let (tx, rx) = mpsc::unbounded_channel();
            tasks.push(spawn_debounced(input, settle, rx, events.clone()));
            raw.insert(input, tx);
        }

        Self { events, raw, tasks }
    }

    /// Submit a raw level; returns `false` once the controller is gone
    pub fn submit(&self, input: Input, level: Level) -> bool {
        match self.raw.get(&input) {
            Some(tx) => tx.send(level).is_ok(),
            None => self.events.send(Event::input(input, level)).is_ok(),
        }
    }

    /// Act on a console command; returns `false` when input should stop
    pub fn dispatch(&self, command: Command) -> bool {
        match command {
            Command::Set { input, level } => self.submit(input, level),
            Command::Run(task) => self.events.send(Event::Scheduled(task)).is_ok(),
            Command::Status => self.events.send(Event::Status).is_ok(),
            Command::Quit => {
                let _ = self.events.send(Event::Shutdown);
                false
            }
        }
    }
}

impl Drop for InputRouter {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Feed console lines to `router` until end of input or `quit`
pub async fn read_commands<R>(reader: R, router: &InputRouter) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(Some(command)) => {
                if !router.dispatch(command) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(line = %line.trim(), "{}", e),
        }
    }
    tracing::debug!("Console input finished");
    Ok(())
}

/// Read commands from standard input
pub async fn read_console(router: &InputRouter) -> std::io::Result<()> {
    read_commands(tokio::io::BufReader::new(tokio::io::stdin()), router).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::channel;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("pressure 1").unwrap(),
            Some(Command::Set {
                input: Input::PressureSwitch,
                level: Level::High
            })
        );
        assert_eq!(
            parse_line("  Override off ").unwrap(),
            Some(Command::Set {
                input: Input::ManualOverride,
                level: Level::Low
            })
        );
        assert_eq!(parse_line("rotate").unwrap(), Some(Command::Run(Task::Rotate)));
        assert_eq!(parse_line("# comment").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_line("valve 1"),
            Err(CommandError::Unknown("valve".into()))
        );
        assert_eq!(
            parse_line("well"),
            Err(CommandError::MissingLevel("well".into()))
        );
        assert_eq!(
            parse_line("well maybe"),
            Err(CommandError::InvalidLevel("maybe".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_routes_inputs() {
        let (events, mut rx) = channel();
        let router = InputRouter::new(events, Duration::from_millis(50));

        let script: &[u8] = b"well 1\nbogus\npressure 1\nstatus\nquit\nexport\n";
        read_commands(script, &router).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen[0], Event::input(Input::ManualWell, Level::High));
        assert_eq!(seen[1], Event::Status);
        assert_eq!(seen[2], Event::Shutdown);
        assert_eq!(seen[3], Event::input(Input::PressureSwitch, Level::High));

        // Nothing after quit was read
        drop(router);
        assert!(rx.try_recv().is_err());
    }
}
