//! Adaptive, self-rescheduling tick scheduler.
//!
//! Instead of a fixed interval the ticker arms one wake-up at a time. Each
//! wake-up measures the wall-clock delta since the previous tick, adds it to
//! the current section, checks for completion and arms the next wake-up. The
//! delay is the tick rate, shortened so the last tick lands on the exact end
//! of the section.
//!
//! At most one wake-up is armed: arming always cancels the previous one, and
//! a fired token that is not the armed one is ignored.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clock::{Clock, WakeToken};
use crate::events::EventType;
use crate::tasks::TaskList;
use crate::types::{SectionEndAction, TimerState};

use super::machine::{Deferred, PomodoroTimer};

/// Tick rate changes at or below this many milliseconds are ignored.
pub const TICK_RATE_EPSILON_MS: u64 = 50;

// ============================================================================
// TickOptions
// ============================================================================

/// Parameters of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOptions {
    /// State the timer will be in after this tick. Completion is only
    /// detected when this is `Running`.
    pub next_state: TimerState,
    /// Whether the measured delta counts as elapsed time. Measurement-only
    /// ticks just move the reference point.
    pub decrement: bool,
}

impl Default for TickOptions {
    fn default() -> Self {
        Self {
            next_state: TimerState::Running,
            decrement: true,
        }
    }
}

/// Returns true if this tick crossed the end of the section.
///
/// Once elapsed time is past `length`, later ticks no longer report
/// completion.
pub fn just_finished(time_elapsed: f64, delta: f64, length: f64) -> bool {
    time_elapsed >= length && time_elapsed - delta < length
}

// ============================================================================
// TickScheduler
// ============================================================================

/// Tick bookkeeping: last measurement, tick rate and the armed wake-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickScheduler {
    last_update_ms: u64,
    next_tick_delta_ms: u64,
    pending: Option<WakeToken>,
}

impl TickScheduler {
    /// Creates an idle scheduler.
    pub fn new(now_ms: u64, tick_rate_ms: u64) -> Self {
        Self {
            last_update_ms: now_ms,
            next_tick_delta_ms: tick_rate_ms.max(1),
            pending: None,
        }
    }

    /// Time of the last tick.
    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }

    /// Current tick interval.
    pub fn next_tick_delta_ms(&self) -> u64 {
        self.next_tick_delta_ms
    }

    /// The armed wake-up, if any.
    pub fn pending(&self) -> Option<WakeToken> {
        self.pending
    }

    /// Returns true if a wake-up is armed.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Arms a wake-up after `delay`, cancelling the previous one first.
    pub fn arm<C: Clock>(&mut self, clock: &mut C, delay: Duration) -> WakeToken {
        self.disarm(clock);
        let token = clock.schedule_after(delay);
        self.pending = Some(token);
        token
    }

    /// Cancels the armed wake-up. Does nothing if none is armed.
    pub fn disarm<C: Clock>(&mut self, clock: &mut C) {
        if let Some(token) = self.pending.take() {
            clock.cancel(token);
        }
    }

    /// Consumes a fired token. Returns false for stale tokens.
    pub fn accept_wake(&mut self, token: WakeToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Measures seconds since the last tick and moves the reference to `now_ms`.
    ///
    /// Clock steps backwards give zero; jumps longer than `max_delta_secs`
    /// are clamped.
    pub fn measure(&mut self, now_ms: u64, max_delta_secs: u64) -> f64 {
        let raw_ms = now_ms.saturating_sub(self.last_update_ms);
        if now_ms < self.last_update_ms {
            warn!(
                now_ms,
                last_update_ms = self.last_update_ms,
                "clock went backwards, ignoring delta"
            );
        }
        self.last_update_ms = now_ms;

        let max_ms = max_delta_secs.saturating_mul(1000);
        if raw_ms > max_ms {
            warn!(delta_ms = raw_ms, max_ms, "tick delta clamped");
        }
        raw_ms.min(max_ms) as f64 / 1000.0
    }

    /// Returns true if `rate_ms` differs from the current rate by more than
    /// [`TICK_RATE_EPSILON_MS`].
    pub fn is_significant_change(&self, rate_ms: u64) -> bool {
        rate_ms.abs_diff(self.next_tick_delta_ms) > TICK_RATE_EPSILON_MS
    }

    /// Adopts `rate_ms` if the change is significant. Returns whether it was.
    pub fn update_tick_rate(&mut self, rate_ms: u64) -> bool {
        if self.is_significant_change(rate_ms) {
            self.next_tick_delta_ms = rate_ms.max(1);
            true
        } else {
            false
        }
    }

    /// Delay until the next tick given the remaining section time.
    pub fn next_delay(&self, time_remaining_secs: f64) -> Duration {
        let tick_ms = self.next_tick_delta_ms;
        if time_remaining_secs > 0.0 {
            let remaining_ms = (time_remaining_secs * 1000.0).ceil() as u64;
            Duration::from_millis(tick_ms.min(remaining_ms.max(1)))
        } else {
            Duration::from_millis(tick_ms)
        }
    }
}

// ============================================================================
// Tick algorithm
// ============================================================================

impl<C: Clock, T: TaskList> PomodoroTimer<C, T> {
    /// Delivers a fired wake-up. Stale tokens are ignored.
    pub fn on_wake(&mut self, token: WakeToken) {
        if !self.ticker.accept_wake(token) {
            trace!(token = token.id(), "stale wake-up ignored");
            return;
        }
        if self.state != TimerState::Running {
            return;
        }
        self.schedule_next_tick(true);
    }

    /// Ticks once and, if still running, arms the next wake-up.
    pub(super) fn schedule_next_tick(&mut self, decrement: bool) {
        self.timer_tick(TickOptions {
            decrement,
            ..TickOptions::default()
        });

        if self.state != TimerState::Running {
            return;
        }

        let rate = self.settings.adaptive_ticking.tick_rate_ms(self.visible);
        self.ticker.update_tick_rate(rate);

        let remaining = self.current().time_remaining;
        let delay = self.ticker.next_delay(remaining);
        let token = self.ticker.arm(&mut self.clock, delay);
        debug!(
            token = token.id(),
            delay_ms = delay.as_millis() as u64,
            remaining_secs = remaining,
            "next tick armed"
        );
    }

    /// One tick: measure, accumulate, detect completion.
    pub(super) fn timer_tick(&mut self, options: TickOptions) {
        let now = self.clock.now_ms();
        let delta = self.ticker.measure(now, self.settings.max_tick_delta_secs);
        let applied = if options.decrement { delta } else { 0.0 };

        self.schedule.current_mut().time_elapsed += applied;
        let current = self.current();

        if options.next_state != TimerState::Running
            || !just_finished(current.time_elapsed, applied, current.length)
        {
            return;
        }

        debug!(
            id = current.id,
            section = current.section.as_str(),
            elapsed = current.time_elapsed,
            "section finished"
        );
        self.record_event(
            EventType::TimerFinish,
            Some(serde_json::json!({
                "id": current.id,
                "section": current.section.as_str(),
            })),
        );

        match self.settings.section_end_action {
            SectionEndAction::Stop => self.set_state(TimerState::Completed),
            SectionEndAction::Skip => self.deferred.push_back(Deferred::AutoAdvance),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::schedule::Schedule;
    use crate::settings::Settings;
    use crate::tasks::InMemoryTaskList;
    use crate::types::ScheduleEntry;

    type TestTimer = PomodoroTimer<ManualClock, InMemoryTaskList>;

    /// Settings with a 1 s tick and a locked 5 s first section.
    fn create_short_timer(action: SectionEndAction) -> (TestTimer, ManualClock) {
        let clock = ManualClock::new(0);
        let mut first = ScheduleEntry::new(0);
        first.length = Some(5.0);
        let schedule = Schedule::from_entries(vec![first, ScheduleEntry::new(1)]);
        let settings = Settings::default().with_section_end_action(action);
        let timer = PomodoroTimer::with_schedule(
            settings,
            clock.clone(),
            InMemoryTaskList::new(),
            schedule,
        );
        (timer, clock)
    }

    fn fire(timer: &mut TestTimer, clock: &ManualClock) {
        let token = clock.fire_next().expect("a wake-up should be armed");
        timer.on_wake(token);
    }

    fn finish_count(timer: &TestTimer) -> usize {
        timer
            .events()
            .iter()
            .filter(|e| e.event_type == EventType::TimerFinish)
            .count()
    }

    // ------------------------------------------------------------------------
    // TickScheduler Tests
    // ------------------------------------------------------------------------

    mod tick_scheduler_tests {
        use super::*;

        #[test]
        fn test_just_finished() {
            assert!(just_finished(5.0, 1.0, 5.0));
            assert!(just_finished(5.5, 1.0, 5.0));
            assert!(!just_finished(4.9, 1.0, 5.0));
            assert!(!just_finished(6.5, 1.0, 5.0));
            assert!(!just_finished(5.0, 0.0, 5.0));
        }

        #[test]
        fn test_measure() {
            let mut ticker = TickScheduler::new(1_000, 1_000);
            assert_eq!(ticker.measure(2_500, 60), 1.5);
            assert_eq!(ticker.last_update_ms(), 2_500);
        }

        #[test]
        fn test_measure_clamps_backwards_clock() {
            let mut ticker = TickScheduler::new(5_000, 1_000);
            assert_eq!(ticker.measure(4_000, 60), 0.0);
            assert_eq!(ticker.last_update_ms(), 4_000);
        }

        #[test]
        fn test_measure_clamps_large_jump() {
            let mut ticker = TickScheduler::new(0, 1_000);
            assert_eq!(ticker.measure(3_600_000, 60), 60.0);
        }

        #[test]
        fn test_next_delay_uses_tick_rate() {
            let ticker = TickScheduler::new(0, 1_000);
            assert_eq!(ticker.next_delay(300.0), Duration::from_millis(1_000));
        }

        #[test]
        fn test_next_delay_lands_on_section_end() {
            let ticker = TickScheduler::new(0, 1_000);
            assert_eq!(ticker.next_delay(0.25), Duration::from_millis(250));
        }

        #[test]
        fn test_next_delay_after_overshoot() {
            let ticker = TickScheduler::new(0, 1_000);
            assert_eq!(ticker.next_delay(-3.0), Duration::from_millis(1_000));
            assert_eq!(ticker.next_delay(0.0), Duration::from_millis(1_000));
        }

        #[test]
        fn test_update_tick_rate_epsilon() {
            let mut ticker = TickScheduler::new(0, 1_000);
            assert!(!ticker.update_tick_rate(1_050));
            assert_eq!(ticker.next_tick_delta_ms(), 1_000);
            assert!(ticker.update_tick_rate(1_051));
            assert_eq!(ticker.next_tick_delta_ms(), 1_051);
        }

        #[test]
        fn test_arm_cancels_previous() {
            let mut clock = ManualClock::new(0);
            let mut ticker = TickScheduler::new(0, 1_000);

            let first = ticker.arm(&mut clock, Duration::from_millis(100));
            let second = ticker.arm(&mut clock, Duration::from_millis(100));

            assert_ne!(first, second);
            assert_eq!(ticker.pending(), Some(second));
            assert_eq!(clock.pending_count(), 1);
            assert_eq!(clock.cancelled_count(), 1);
        }

        #[test]
        fn test_disarm_is_idempotent() {
            let mut clock = ManualClock::new(0);
            let mut ticker = TickScheduler::new(0, 1_000);
            ticker.arm(&mut clock, Duration::from_millis(100));

            ticker.disarm(&mut clock);
            ticker.disarm(&mut clock);

            assert!(!ticker.is_armed());
            assert_eq!(clock.pending_count(), 0);
        }

        #[test]
        fn test_accept_wake_rejects_stale_token() {
            let mut clock = ManualClock::new(0);
            let mut ticker = TickScheduler::new(0, 1_000);
            let stale = ticker.arm(&mut clock, Duration::from_millis(100));
            let current = ticker.arm(&mut clock, Duration::from_millis(100));

            assert!(!ticker.accept_wake(stale));
            assert!(ticker.is_armed());
            assert!(ticker.accept_wake(current));
            assert!(!ticker.is_armed());
        }
    }

    // ------------------------------------------------------------------------
    // Tick Algorithm Tests
    // ------------------------------------------------------------------------

    mod tick_algorithm_tests {
        use super::*;

        #[test]
        fn test_ticks_accumulate_elapsed_time() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();

            for expected in 1..=3 {
                fire(&mut timer, &clock);
                assert_eq!(timer.current().time_elapsed, f64::from(expected));
            }
            assert_eq!(clock.pending_count(), 1);
        }

        #[test]
        fn test_last_tick_lands_on_section_end() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            clock.advance(500);
            // re-measure at 0.5 s so the ticks are out of phase with the end
            timer.pause().unwrap();
            timer.start().unwrap();

            for _ in 0..4 {
                fire(&mut timer, &clock);
            }
            assert_eq!(timer.current().time_elapsed, 4.5);
            assert_eq!(clock.next_due_ms(), Some(clock.now_ms() + 500));

            fire(&mut timer, &clock);
            assert_eq!(timer.current().time_elapsed, 5.0);
            assert_eq!(timer.state(), TimerState::Completed);
        }

        #[test]
        fn test_stop_policy_completes_and_disarms() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();

            for _ in 0..5 {
                fire(&mut timer, &clock);
            }

            assert_eq!(timer.state(), TimerState::Completed);
            assert!(!timer.ticker().is_armed());
            assert_eq!(clock.pending_count(), 0);
            assert_eq!(finish_count(&timer), 1);
            assert_eq!(timer.pending_deferred(), 0);
        }

        #[test]
        fn test_skip_policy_defers_advance_once() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Skip);
            timer.start().unwrap();

            for _ in 0..5 {
                fire(&mut timer, &clock);
            }

            assert_eq!(timer.state(), TimerState::Running);
            assert!(timer.ticker().is_armed());
            assert_eq!(finish_count(&timer), 1);
            assert_eq!(timer.pending_deferred(), 1);
            // the finished entry is still current until the deferred work runs
            assert_eq!(timer.current().id, 0);

            assert_eq!(timer.run_deferred(), 1);
            assert_eq!(timer.current().id, 1);
            assert_eq!(timer.current().time_elapsed, 0.0);
            assert_eq!(timer.state(), TimerState::Running);
            assert_eq!(timer.pending_deferred(), 0);
        }

        #[test]
        fn test_finish_fires_once_on_overshoot() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Skip);
            timer.start().unwrap();
            for _ in 0..5 {
                fire(&mut timer, &clock);
            }

            // without running deferred work the entry keeps overshooting
            for _ in 0..3 {
                fire(&mut timer, &clock);
            }

            assert_eq!(timer.current().time_elapsed, 8.0);
            assert_eq!(finish_count(&timer), 1);
            assert_eq!(timer.pending_deferred(), 1);
        }

        #[test]
        fn test_start_after_completed_resets() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            for _ in 0..5 {
                fire(&mut timer, &clock);
            }
            assert_eq!(timer.state(), TimerState::Completed);

            timer.start().unwrap();

            assert_eq!(timer.state(), TimerState::Running);
            assert_eq!(timer.current().time_elapsed, 0.0);
            assert!(timer.ticker().is_armed());
        }

        #[test]
        fn test_stop_after_completed() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            for _ in 0..5 {
                fire(&mut timer, &clock);
            }

            timer.stop().unwrap();

            assert_eq!(timer.state(), TimerState::Stopped);
            assert_eq!(timer.current().time_elapsed, 0.0);
        }

        #[test]
        fn test_stale_wake_is_ignored() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            let stale = timer.ticker().pending().unwrap();
            timer.pause().unwrap();
            timer.start().unwrap();
            clock.advance(700);

            timer.on_wake(stale);

            assert_eq!(timer.current().time_elapsed, 0.0);
            assert_ne!(timer.ticker().pending(), Some(stale));
            assert_eq!(clock.pending_count(), 1);
        }

        #[test]
        fn test_wake_after_pause_is_ignored() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            let token = timer.ticker().pending().unwrap();
            clock.advance(400);
            timer.pause().unwrap();

            timer.on_wake(token);

            assert_eq!(timer.current().time_elapsed, 0.4);
            assert_eq!(clock.pending_count(), 0);
        }

        #[test]
        fn test_hidden_client_rearms_with_background_rate() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            let mut settings = Settings::default();
            settings.adaptive_ticking.background_rate_ms = 3_000;
            timer.update_settings(settings).unwrap();
            timer.start().unwrap();
            clock.advance(200);

            timer.set_visible(false);

            assert_eq!(timer.ticker().next_tick_delta_ms(), 3_000);
            assert_eq!(timer.current().time_elapsed, 0.2);
            assert_eq!(clock.pending_count(), 1);
            assert_eq!(clock.next_due_ms(), Some(clock.now_ms() + 3_000));
        }

        #[test]
        fn test_insignificant_rate_change_does_not_rearm() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            let scheduled = clock.scheduled_count();

            timer
                .update_settings(Settings::default().with_base_rate_ms(1_030))
                .unwrap();

            assert_eq!(clock.scheduled_count(), scheduled);
            assert_eq!(timer.ticker().next_tick_delta_ms(), 1_000);
        }

        #[test]
        fn test_significant_rate_change_rearms_immediately() {
            let (mut timer, clock) = create_short_timer(SectionEndAction::Stop);
            timer.start().unwrap();
            let scheduled = clock.scheduled_count();

            timer
                .update_settings(Settings::default().with_base_rate_ms(250))
                .unwrap();

            assert_eq!(clock.scheduled_count(), scheduled + 1);
            assert_eq!(clock.pending_count(), 1);
            assert_eq!(clock.next_due_ms(), Some(clock.now_ms() + 250));
        }
    }
}
