//! Timer module for the Pomodoro ticker.
//!
//! This module contains the scheduling core:
//! - `machine`: the timer state machine and its transitions
//! - `ticker`: the adaptive self-rescheduling tick scheduler
//! - `runtime`: the single-threaded event loop driving both
//! - `error`: command errors

pub mod error;
pub mod machine;
pub mod runtime;
pub mod ticker;

pub use error::TimerError;
pub use machine::{Deferred, PomodoroTimer};
pub use runtime::{RuntimeHandle, TimerCommand, TimerRuntime, TimerSnapshot};
pub use ticker::{just_finished, TickOptions, TickScheduler, TICK_RATE_EPSILON_MS};
