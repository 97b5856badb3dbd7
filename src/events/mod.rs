//! Rolling log of timer lifecycle events.
//!
//! The log keeps at most [`MAX_EVENTS`] entries and drops the oldest first.
//! An optional subscriber receives a copy of every recorded event, which is
//! how the runtime forwards events to the display.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default number of events retained.
pub const MAX_EVENTS: usize = 200;

// ============================================================================
// EventType
// ============================================================================

/// Kinds of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Client window gained focus
    #[serde(rename = "focus.gain")]
    FocusGain,
    /// Client window lost focus
    #[serde(rename = "focus.lost")]
    FocusLost,
    /// Timer started or resumed
    #[serde(rename = "timer.start")]
    TimerStart,
    /// Timer paused
    #[serde(rename = "timer.pause")]
    TimerPause,
    /// Timer stopped
    #[serde(rename = "timer.stop")]
    TimerStop,
    /// Current section reached its length
    #[serde(rename = "timer.complete")]
    TimerFinish,
    /// Schedule advanced by the user
    #[serde(rename = "schedule.adv.manual")]
    ScheduleAdvanceManual,
    /// Schedule advanced automatically after a section finished
    #[serde(rename = "schedule.adv.auto")]
    ScheduleAdvanceAuto,
    /// Application started
    #[serde(rename = "app.start")]
    AppStarted,
    /// Application error
    #[serde(rename = "app.error")]
    AppError,
    /// Notification permission granted
    #[serde(rename = "permission.notification")]
    NotificationsEnabled,
    /// Anything else
    #[serde(rename = "other")]
    Other,
}

impl EventType {
    /// Returns the dotted event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FocusGain => "focus.gain",
            EventType::FocusLost => "focus.lost",
            EventType::TimerStart => "timer.start",
            EventType::TimerPause => "timer.pause",
            EventType::TimerStop => "timer.stop",
            EventType::TimerFinish => "timer.complete",
            EventType::ScheduleAdvanceManual => "schedule.adv.manual",
            EventType::ScheduleAdvanceAuto => "schedule.adv.auto",
            EventType::AppStarted => "app.start",
            EventType::AppError => "app.error",
            EventType::NotificationsEnabled => "permission.notification",
            EventType::Other => "other",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event
// ============================================================================

/// A timestamped lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Event kind
    pub event_type: EventType,
    /// Optional opaque payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ============================================================================
// EventLog
// ============================================================================

/// Append-only event log with FIFO eviction.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<Event>,
    max_events: usize,
    subscriber: Option<mpsc::UnboundedSender<Event>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty log retaining [`MAX_EVENTS`] events.
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    /// Creates an empty log retaining at most `max_events` events (at least one).
    pub fn with_capacity(max_events: usize) -> Self {
        let max_events = max_events.max(1);
        Self {
            events: VecDeque::with_capacity(max_events.min(MAX_EVENTS)),
            max_events,
            subscriber: None,
        }
    }

    /// Forwards every subsequently recorded event to `tx`.
    pub fn subscribe(&mut self, tx: mpsc::UnboundedSender<Event>) {
        self.subscriber = Some(tx);
    }

    /// Appends an event and evicts the oldest ones beyond capacity.
    pub fn record(
        &mut self,
        timestamp_ms: u64,
        event_type: EventType,
        data: Option<serde_json::Value>,
    ) {
        tracing::debug!(event = %event_type, timestamp_ms, "event recorded");

        let event = Event {
            timestamp_ms,
            event_type,
            data,
        };

        if let Some(tx) = &self.subscriber {
            if tx.send(event.clone()).is_err() {
                tracing::debug!("event subscriber dropped");
                self.subscriber = None;
            }
        }

        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    /// Returns the most recent event, if any.
    pub fn last_event(&self) -> Option<&Event> {
        self.events.back()
    }

    /// Iterates events from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events.
    pub fn max_events(&self) -> usize {
        self.max_events
    }
}

// ============================================================================
// Tests
// ============================================================================
