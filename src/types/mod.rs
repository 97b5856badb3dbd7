//! Core data types for the Pomodoro ticker.
//!
//! This module defines the data structures shared by the scheduling core:
//! - Section kinds and the timer state
//! - End-of-section policy
//! - Raw and resolved schedule entries

use serde::{Deserialize, Serialize};

// ============================================================================
// Section
// ============================================================================

/// One kind of scheduled block of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Focused work
    Work,
    /// Short break between work sections
    ShortPause,
    /// Long break at the end of a rotation
    LongPause,
}

impl Section {
    /// Returns the string representation of the section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Work => "work",
            Section::ShortPause => "shortpause",
            Section::LongPause => "longpause",
        }
    }

    /// Returns true for either kind of break.
    pub fn is_break(&self) -> bool {
        !matches!(self, Section::Work)
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// State of the single timer of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Not running, elapsed time is zero
    #[default]
    Stopped,
    /// Ticking
    Running,
    /// Halted with elapsed time preserved
    Paused,
    /// The current section reached its length under the `Stop` policy
    Completed,
}

impl TimerState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Stopped => "stopped",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Completed => "completed",
        }
    }

    /// Returns true if a section is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, TimerState::Running | TimerState::Paused)
    }
}

// ============================================================================
// SectionEndAction
// ============================================================================

/// What happens when the current section reaches its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionEndAction {
    /// Move the timer to `Completed` and wait for the user
    #[default]
    Stop,
    /// Advance to the next section and keep running
    Skip,
}

impl std::str::FromStr for SectionEndAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(SectionEndAction::Stop),
            "skip" => Ok(SectionEndAction::Skip),
            other => Err(format!("不明な終了動作です: {}", other)),
        }
    }
}

// ============================================================================
// ScheduleEntry
// ============================================================================

/// A raw schedule entry: one position in the infinite rotation.
///
/// `length` and `section` are `None` unless locked; unlocked values are
/// resolved from settings and the rotation on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Position in the rotation, strictly increasing along the schedule
    pub id: u64,
    /// Accumulated active seconds
    pub time_elapsed: f64,
    /// Locked section length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// Locked section kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

impl ScheduleEntry {
    /// Creates a fresh, unlocked entry.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            time_elapsed: 0.0,
            length: None,
            section: None,
        }
    }

    /// Returns true if length or section is locked.
    pub fn is_locked(&self) -> bool {
        self.length.is_some() || self.section.is_some()
    }
}

// ============================================================================
// ResolvedEntry
// ============================================================================

/// A schedule entry with every derived field filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    /// Position in the rotation
    pub id: u64,
    /// Accumulated active seconds
    pub time_elapsed: f64,
    /// Total section length in seconds
    pub length: f64,
    /// Section kind
    pub section: Section,
    /// `length - time_elapsed`; negative once the section overshoots
    pub time_remaining: f64,
}

impl ResolvedEntry {
    /// Remaining whole seconds, rounded up and floored at zero.
    pub fn remaining_seconds(&self) -> u64 {
        if self.time_remaining <= 0.0 {
            0
        } else {
            self.time_remaining.ceil() as u64
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
