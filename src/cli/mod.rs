//! CLI module for the Pomodoro ticker.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `session`: Foreground session driving the timer runtime
//! - `display`: Output formatting and display logic

pub mod commands;
pub mod display;
pub mod session;

pub use commands::{Cli, Commands, RunArgs, ScheduleArgs, SettingsArgs};
pub use display::Display;
pub use session::{parse_input, run_foreground, run_session, InputAction};
