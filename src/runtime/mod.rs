//! Runtime wiring
//!
//! - **app**: The controller and its single-queue event loop
//! - **input**: Console commands and debounced input routing

pub mod app;
pub mod input;

pub use app::{App, Flow, Outputs};
pub use input::{parse_line, read_commands, read_console, Command, CommandError, InputRouter};
