//! Time source and single-shot wake-ups.
//!
//! The ticker never sleeps itself. It asks a [`Clock`] for the current time
//! and for one delayed wake-up at a time, identified by a [`WakeToken`]. The
//! owner of the timer delivers fired tokens back to it.
//!
//! - [`TokioClock`]: sleeps on the tokio timer and sends fired tokens on a
//!   channel
//! - [`ManualClock`]: time only moves when a test says so; counts schedules
//!   and cancellations

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Clock
// ============================================================================

/// Identifies one scheduled wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WakeToken(u64);

impl WakeToken {
    /// Raw token number.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Wall-clock time and a single-shot delayed wake-up primitive.
pub trait Clock {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Schedules a wake-up after `delay` and returns its token.
    fn schedule_after(&mut self, delay: Duration) -> WakeToken;

    /// Cancels a wake-up. Unknown or already fired tokens are ignored.
    fn cancel(&mut self, token: WakeToken);
}

fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// TokioClock
// ============================================================================

/// Clock backed by the tokio timer.
///
/// Time is measured from a tokio [`Instant`] anchored to the wall clock at
/// construction, so it never goes backwards and follows paused test time.
/// Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct TokioClock {
    origin: Instant,
    epoch_ms: u64,
    next_id: u64,
    pending: HashMap<WakeToken, JoinHandle<()>>,
    wake_tx: mpsc::UnboundedSender<WakeToken>,
}

impl TokioClock {
    /// Creates a clock and the receiver on which fired tokens arrive.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WakeToken>) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let clock = Self {
            origin: Instant::now(),
            epoch_ms: system_now_ms(),
            next_id: 0,
            pending: HashMap::new(),
            wake_tx,
        };
        (clock, wake_rx)
    }

    /// Number of wake-ups that have not been cancelled or delivered.
    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|(_, h)| !h.is_finished()).count()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as u64
    }

    fn schedule_after(&mut self, delay: Duration) -> WakeToken {
        self.next_id += 1;
        let token = WakeToken(self.next_id);
        let tx = self.wake_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(token);
        });

        self.pending.retain(|_, h| !h.is_finished());
        self.pending.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: WakeToken) {
        if let Some(handle) = self.pending.remove(&token) {
            handle.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

// ============================================================================
// ManualClock
// ============================================================================

#[derive(Debug, Default)]
struct ManualState {
    now_ms: u64,
    next_id: u64,
    pending: Vec<(WakeToken, u64)>,
    scheduled: usize,
    cancelled: usize,
    cancel_calls: usize,
}

/// Deterministic clock for tests.
///
/// Clones share the same state, so a test can keep one handle while the
/// timer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        let clock = Self::default();
        clock.lock().now_ms = start_ms;
        clock
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Moves time forward without firing anything.
    pub fn advance(&self, ms: u64) {
        self.lock().now_ms += ms;
    }

    /// Moves time to the earliest pending wake-up and returns its token.
    ///
    /// The token is removed from the pending set as if it had fired.
    pub fn fire_next(&self) -> Option<WakeToken> {
        let mut state = self.lock();
        let index = state
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, (token, due))| (*due, *token))
            .map(|(i, _)| i)?;
        let (token, due) = state.pending.remove(index);
        state.now_ms = state.now_ms.max(due);
        Some(token)
    }

    /// Due time of the earliest pending wake-up.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.lock().pending.iter().map(|(_, due)| *due).min()
    }

    /// Wake-ups scheduled and neither fired nor cancelled.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Total number of `schedule_after` calls.
    pub fn scheduled_count(&self) -> usize {
        self.lock().scheduled
    }

    /// Number of cancels that removed a pending wake-up.
    pub fn cancelled_count(&self) -> usize {
        self.lock().cancelled
    }

    /// Total number of `cancel` calls, including no-ops.
    pub fn cancel_calls(&self) -> usize {
        self.lock().cancel_calls
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.lock().now_ms
    }

    fn schedule_after(&mut self, delay: Duration) -> WakeToken {
        let mut state = self.lock();
        state.next_id += 1;
        state.scheduled += 1;
        let token = WakeToken(state.next_id);
        let due = state.now_ms + delay.as_millis() as u64;
        state.pending.push((token, due));
        token
    }

    fn cancel(&mut self, token: WakeToken) {
        let mut state = self.lock();
        state.cancel_calls += 1;
        let before = state.pending.len();
        state.pending.retain(|(t, _)| *t != token);
        if state.pending.len() < before {
            state.cancelled += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod manual_clock_tests {
        use super::*;

        #[test]
        fn test_now_and_advance() {
            let clock = ManualClock::new(1_000);
            clock.advance(250);
            assert_eq!(clock.now_ms(), 1_250);
        }

        #[test]
        fn test_fire_next_moves_time_to_due() {
            let mut clock = ManualClock::new(0);
            let late = clock.schedule_after(Duration::from_millis(500));
            let early = clock.schedule_after(Duration::from_millis(200));

            assert_eq!(clock.fire_next(), Some(early));
            assert_eq!(clock.now_ms(), 200);
            assert_eq!(clock.fire_next(), Some(late));
            assert_eq!(clock.now_ms(), 500);
            assert_eq!(clock.fire_next(), None);
        }

        #[test]
        fn test_fire_next_does_not_move_time_backwards() {
            let mut clock = ManualClock::new(0);
            let token = clock.schedule_after(Duration::from_millis(100));
            clock.advance(400);

            assert_eq!(clock.fire_next(), Some(token));
            assert_eq!(clock.now_ms(), 400);
        }

        #[test]
        fn test_cancel_is_idempotent() {
            let mut clock = ManualClock::new(0);
            let token = clock.schedule_after(Duration::from_millis(100));

            clock.cancel(token);
            clock.cancel(token);

            assert_eq!(clock.pending_count(), 0);
            assert_eq!(clock.cancelled_count(), 1);
            assert_eq!(clock.cancel_calls(), 2);
        }

        #[test]
        fn test_clones_share_state() {
            let clock = ManualClock::new(0);
            let mut owned = clock.clone();
            owned.schedule_after(Duration::from_millis(10));

            assert_eq!(clock.scheduled_count(), 1);
            assert_eq!(clock.next_due_ms(), Some(10));
        }
    }

    mod tokio_clock_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wake_up_is_delivered() {
            let (mut clock, mut rx) = TokioClock::new();
            let token = clock.schedule_after(Duration::from_millis(300));

            let fired = rx.recv().await.unwrap();
            assert_eq!(fired, token);
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancelled_wake_up_is_not_delivered() {
            let (mut clock, mut rx) = TokioClock::new();
            let cancelled = clock.schedule_after(Duration::from_millis(100));
            let kept = clock.schedule_after(Duration::from_millis(200));
            clock.cancel(cancelled);
            clock.cancel(cancelled);

            let fired = rx.recv().await.unwrap();
            assert_eq!(fired, kept);
        }

        #[tokio::test(start_paused = true)]
        async fn test_now_follows_tokio_time() {
            let (clock, _rx) = TokioClock::new();
            let before = clock.now_ms();

            tokio::time::advance(Duration::from_millis(1_500)).await;

            assert_eq!(clock.now_ms() - before, 1_500);
        }
    }
}
