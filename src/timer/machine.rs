//! Timer state machine.
//!
//! [`PomodoroTimer`] is the one writer of the timer state and the schedule.
//! User commands move it between `Stopped`, `Running`, `Paused` and
//! `Completed`; the tick scheduler (see `ticker.rs`) drives elapsed time and
//! completion while it is `Running`.
//!
//! ```text
//!            start                 pause
//!  Stopped ─────────► Running ─────────────► Paused
//!     ▲  ◄─────────────  │  ◄──────────────────┘ start
//!     │      stop        │ section done (Stop policy)
//!     │                  ▼
//!     └──── stop ──── Completed ── start ──► Running
//! ```

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::events::{EventLog, EventType};
use crate::schedule::Schedule;
use crate::settings::Settings;
use crate::tasks::TaskList;
use crate::types::{ResolvedEntry, Section, TimerState};

use super::error::TimerError;
use super::ticker::{TickOptions, TickScheduler};

/// Work queued by a tick, run after the tick callback has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Slide the schedule forward after a finished section
    AutoAdvance,
}

/// The timer of one client session.
///
/// Construct exactly one per process and pass it to whatever drives it
/// (normally [`super::TimerRuntime`]).
#[derive(Debug)]
pub struct PomodoroTimer<C: Clock, T: TaskList> {
    pub(super) state: TimerState,
    pub(super) schedule: Schedule,
    pub(super) settings: Settings,
    pub(super) events: EventLog,
    pub(super) ticker: TickScheduler,
    pub(super) clock: C,
    pub(super) tasks: T,
    pub(super) visible: bool,
    pub(super) deferred: VecDeque<Deferred>,
}

impl<C: Clock, T: TaskList> PomodoroTimer<C, T> {
    /// Creates a stopped timer with a fresh schedule.
    ///
    /// `settings` are expected to be validated already; a zero long break
    /// interval is still tolerated and treated as 1.
    pub fn new(settings: Settings, clock: C, tasks: T) -> Self {
        Self::with_schedule(settings, clock, tasks, Schedule::new())
    }

    /// Creates a stopped timer over an existing schedule.
    pub fn with_schedule(settings: Settings, clock: C, tasks: T, schedule: Schedule) -> Self {
        let visible = true;
        let ticker = TickScheduler::new(
            clock.now_ms(),
            settings.adaptive_ticking.tick_rate_ms(visible),
        );
        Self {
            state: TimerState::Stopped,
            schedule,
            settings,
            events: EventLog::new(),
            ticker,
            clock,
            tasks,
            visible,
            deferred: VecDeque::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current timer state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// The raw schedule.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Mutable event log, e.g. to attach a subscriber.
    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// The tick scheduler state.
    pub fn ticker(&self) -> &TickScheduler {
        &self.ticker
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The task list.
    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    /// Mutable task list.
    pub fn tasks_mut(&mut self) -> &mut T {
        &mut self.tasks
    }

    /// The current section, resolved.
    pub fn current(&self) -> ResolvedEntry {
        self.schedule.current(&self.settings.pomodoro)
    }

    /// The look-ahead window.
    pub fn window(&self) -> Vec<ResolvedEntry> {
        self.schedule.window(&self.settings.pomodoro)
    }

    /// Returns true if the current section is work.
    pub fn is_working(&self) -> bool {
        self.current().section == Section::Work
    }

    /// Returns true if a section is running or paused.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether the client is currently visible.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Work queued for [`Self::run_deferred`].
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Records an event stamped with the clock's current time.
    pub fn record_event(&mut self, event_type: EventType, data: Option<serde_json::Value>) {
        let now = self.clock.now_ms();
        self.events.record(now, event_type, data);
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Starts or resumes the timer.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is already running.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.state == TimerState::Running {
            return Err(TimerError::AlreadyRunning);
        }
        self.set_state(TimerState::Running);
        Ok(())
    }

    /// Pauses the timer, keeping the elapsed time.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not running.
    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Running {
            return Err(TimerError::NotRunning(self.state));
        }
        self.set_state(TimerState::Paused);
        Ok(())
    }

    /// Stops the timer and resets the elapsed time.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is already stopped.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        if self.state == TimerState::Stopped {
            return Err(TimerError::NotRunning(self.state));
        }
        self.set_state(TimerState::Stopped);
        Ok(())
    }

    /// Skips to the next section at the user's request.
    pub fn advance(&mut self) {
        let from = self.schedule.current_id();
        self.record_event(
            EventType::ScheduleAdvanceManual,
            Some(serde_json::json!({ "from": from })),
        );
        self.advance_schedule();
    }

    /// Replaces the settings.
    ///
    /// A locked (running) section keeps its length and kind. A significant
    /// change of the tick rate re-arms the ticker immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), TimerError> {
        settings.validate()?;
        self.settings = settings;
        info!("settings updated");
        self.refresh_tick_rate();
        Ok(())
    }

    /// Records whether the client is visible, which may change the tick rate.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        let event = if visible {
            EventType::FocusGain
        } else {
            EventType::FocusLost
        };
        self.record_event(event, None);
        self.refresh_tick_rate();
    }

    /// Runs work deferred by ticks. Returns the number of items run.
    pub fn run_deferred(&mut self) -> usize {
        let mut count = 0;
        while let Some(item) = self.deferred.pop_front() {
            match item {
                Deferred::AutoAdvance => {
                    let from = self.schedule.current_id();
                    self.record_event(
                        EventType::ScheduleAdvanceAuto,
                        Some(serde_json::json!({ "from": from })),
                    );
                    self.advance_schedule();
                }
            }
            count += 1;
        }
        count
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Enters a new state and performs its side effects.
    pub(super) fn set_state(&mut self, next: TimerState) {
        let previous = self.state;
        if previous == next {
            return;
        }
        self.state = next;
        info!(from = previous.as_str(), to = next.as_str(), "timer state changed");

        if previous == TimerState::Completed {
            self.reset_timer();
        }

        match next {
            TimerState::Running => self.start_timer(),
            TimerState::Stopped => self.pause_or_stop_timer(true),
            TimerState::Paused => self.pause_or_stop_timer(false),
            TimerState::Completed => self.ticker.disarm(&mut self.clock),
        }
    }

    /// Resets elapsed time to zero with a measurement-only tick.
    fn reset_timer(&mut self) {
        let next_state = if self.state == TimerState::Running {
            TimerState::Running
        } else {
            TimerState::Stopped
        };
        self.schedule.current_mut().time_elapsed = 0.0;
        self.timer_tick(TickOptions {
            next_state,
            decrement: false,
        });
    }

    fn start_timer(&mut self) {
        let current = self.current();
        self.record_event(EventType::TimerStart, None);
        self.schedule.lock_current(current.length, current.section);
        self.schedule_next_tick(false);
    }

    fn pause_or_stop_timer(&mut self, stop: bool) {
        self.ticker.disarm(&mut self.clock);
        self.timer_tick(TickOptions {
            next_state: if stop {
                TimerState::Stopped
            } else {
                TimerState::Paused
            },
            decrement: true,
        });

        if stop {
            self.record_event(EventType::TimerStop, None);
            self.schedule.unlock_current();
            self.reset_timer();
        } else {
            self.record_event(EventType::TimerPause, None);
        }
    }

    /// Drops the current section and reacts to the new one.
    fn advance_schedule(&mut self) {
        let previous_id = self.schedule.current_id();
        let current_id = self.schedule.advance();
        if current_id != previous_id {
            self.on_section_changed();
        }
    }

    /// Called whenever the current section's identity changes.
    fn on_section_changed(&mut self) {
        if self.state == TimerState::Running {
            // keep running into the new section
            self.reset_timer();
            let current = self.current();
            self.schedule.lock_current(current.length, current.section);
        } else {
            self.ticker.disarm(&mut self.clock);
            self.state = TimerState::Stopped;
            self.reset_timer();
        }

        let current = self.current();
        info!(
            id = current.id,
            section = current.section.as_str(),
            state = self.state.as_str(),
            "section changed"
        );

        if self.settings.tasks.remove_completed_tasks {
            let removed = self.tasks.remove_completed();
            debug!(removed, "completed tasks removed");
        }
    }

    /// Re-arms the ticker if the tick rate changed significantly while running.
    fn refresh_tick_rate(&mut self) {
        let rate = self.settings.adaptive_ticking.tick_rate_ms(self.visible);
        if self.state == TimerState::Running && self.ticker.is_significant_change(rate) {
            debug!(rate_ms = rate, "tick rate changed, re-arming");
            self.schedule_next_tick(true);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
