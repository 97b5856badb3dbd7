//! Single-threaded event loop driving a [`PomodoroTimer`].
//!
//! The loop waits on two channels: fired wake-ups from the [`TokioClock`]
//! and commands from a [`RuntimeHandle`]. Every input is handled to
//! completion, then deferred work is drained, then a [`TimerSnapshot`] is
//! published. A deferred auto-advance therefore always runs after the tick
//! that queued it and before the next wake-up is processed.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::clock::{TokioClock, WakeToken};
use crate::events::{Event, EventType};
use crate::settings::Settings;
use crate::tasks::TaskList;
use crate::types::{ResolvedEntry, TimerState};

use super::error::TimerError;
use super::machine::PomodoroTimer;

// ============================================================================
// TimerCommand
// ============================================================================

/// Commands accepted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerCommand {
    /// Start or resume
    Start,
    /// Pause
    Pause,
    /// Stop and reset
    Stop,
    /// Skip to the next section
    Advance,
    /// Client visibility changed
    SetVisible(bool),
    /// Replace the settings
    UpdateSettings(Box<Settings>),
    /// Leave the loop
    Shutdown,
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Read-only view of the timer published after every input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    /// Timer state
    pub state: TimerState,
    /// Current section
    pub current: ResolvedEntry,
    /// Look-ahead window, current first
    pub upcoming: Vec<ResolvedEntry>,
    /// Most recent event
    pub last_event: Option<Event>,
}

impl TimerSnapshot {
    /// Captures the state of `timer`.
    pub fn capture<C: crate::clock::Clock, T: TaskList>(timer: &PomodoroTimer<C, T>) -> Self {
        Self {
            state: timer.state(),
            current: timer.current(),
            upcoming: timer.window(),
            last_event: timer.events().last_event().cloned(),
        }
    }
}

// ============================================================================
// RuntimeHandle
// ============================================================================

/// Sending side of the runtime's command channel.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::UnboundedSender<TimerCommand>,
}

impl RuntimeHandle {
    /// Sends a command.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime has shut down.
    pub fn send(&self, command: TimerCommand) -> Result<()> {
        self.tx
            .send(command)
            .context("Timer runtime is not running")
    }

    /// Starts or resumes the timer.
    pub fn start(&self) -> Result<()> {
        self.send(TimerCommand::Start)
    }

    /// Pauses the timer.
    pub fn pause(&self) -> Result<()> {
        self.send(TimerCommand::Pause)
    }

    /// Stops the timer.
    pub fn stop(&self) -> Result<()> {
        self.send(TimerCommand::Stop)
    }

    /// Skips to the next section.
    pub fn advance(&self) -> Result<()> {
        self.send(TimerCommand::Advance)
    }

    /// Asks the runtime to exit.
    pub fn shutdown(&self) -> Result<()> {
        self.send(TimerCommand::Shutdown)
    }
}

// ============================================================================
// TimerRuntime
// ============================================================================

/// Owns the timer and runs its event loop.
pub struct TimerRuntime<T: TaskList> {
    timer: PomodoroTimer<TokioClock, T>,
    wake_rx: mpsc::UnboundedReceiver<WakeToken>,
    command_rx: mpsc::UnboundedReceiver<TimerCommand>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
}

impl<T: TaskList> TimerRuntime<T> {
    /// Creates a runtime, its command handle and a snapshot receiver.
    pub fn new(
        settings: Settings,
        tasks: T,
    ) -> (Self, RuntimeHandle, watch::Receiver<TimerSnapshot>) {
        let (clock, wake_rx) = TokioClock::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let timer = PomodoroTimer::new(settings, clock, tasks);
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::capture(&timer));

        let runtime = Self {
            timer,
            wake_rx,
            command_rx,
            snapshot_tx,
        };
        (runtime, RuntimeHandle { tx: command_tx }, snapshot_rx)
    }

    /// Returns a receiver for every event recorded from now on.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.timer.events_mut().subscribe(tx);
        rx
    }

    /// The timer driven by this runtime.
    pub fn timer(&self) -> &PomodoroTimer<TokioClock, T> {
        &self.timer
    }

    /// Applies one command to the timer.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer rejects the command.
    pub fn apply(&mut self, command: TimerCommand) -> Result<(), TimerError> {
        match command {
            TimerCommand::Start => self.timer.start(),
            TimerCommand::Pause => self.timer.pause(),
            TimerCommand::Stop => self.timer.stop(),
            TimerCommand::Advance => {
                self.timer.advance();
                Ok(())
            }
            TimerCommand::SetVisible(visible) => {
                self.timer.set_visible(visible);
                Ok(())
            }
            TimerCommand::UpdateSettings(settings) => self.timer.update_settings(*settings),
            TimerCommand::Shutdown => Ok(()),
        }
    }

    /// Runs until shutdown or until every handle is dropped.
    ///
    /// Returns the timer so callers can inspect its final state.
    pub async fn run(mut self) -> Result<PomodoroTimer<TokioClock, T>> {
        self.timer.record_event(EventType::AppStarted, None);
        self.publish();
        info!("timer runtime started");

        loop {
            tokio::select! {
                Some(token) = self.wake_rx.recv() => {
                    self.timer.on_wake(token);
                }
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if command == TimerCommand::Shutdown {
                        break;
                    }
                    if let Err(e) = self.apply(command) {
                        warn!(error = %e, "command rejected");
                        self.timer.record_event(
                            EventType::AppError,
                            Some(serde_json::Value::String(e.to_string())),
                        );
                    }
                }
            }

            self.timer.run_deferred();
            self.publish();
        }

        info!("timer runtime stopped");
        Ok(self.timer)
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(TimerSnapshot::capture(&self.timer));
    }
}

// ============================================================================
// Tests
// ============================================================================
