//! Pomodoro Ticker Library
//!
//! This library provides the scheduling core of a Pomodoro timer.
//! It includes:
//! - Schedule generation for the work / short break / long break rotation
//! - A timer state machine with an adaptive tick scheduler
//! - A rolling event log of lifecycle events
//! - A tokio runtime driving the timer, plus CLI parsing and display

pub mod cli;
pub mod clock;
pub mod events;
pub mod schedule;
pub mod settings;
pub mod tasks;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, TokioClock, WakeToken};
pub use events::{Event, EventLog, EventType, MAX_EVENTS};
pub use schedule::{Schedule, WINDOW_SIZE};
pub use settings::{AdaptiveTicking, PomodoroSettings, Preset, Settings, SettingsError};
pub use tasks::{InMemoryTaskList, Task, TaskList};
pub use timer::{
    PomodoroTimer, RuntimeHandle, TickOptions, TimerCommand, TimerError, TimerRuntime,
    TimerSnapshot,
};
pub use types::{ResolvedEntry, ScheduleEntry, Section, SectionEndAction, TimerState};
