//! User settings read by the scheduling core.
//!
//! Settings are plain serde structs, typically loaded from a JSON file and
//! then overridden by command-line flags. The core only reads them; every
//! value is validated here before it reaches the schedule or the ticker.

pub mod error;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{Section, SectionEndAction};

pub use error::SettingsError;

/// Directory under the home directory holding the settings file.
const SETTINGS_DIR: &str = ".pomodoro-ticker";

/// Settings file name.
const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// PomodoroSettings
// ============================================================================

/// Section durations (seconds) and the long break interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroSettings {
    /// Work section length in seconds
    pub pomodoro_study_time: u32,
    /// Short break length in seconds
    pub pomodoro_rest_time: u32,
    /// Long break length in seconds
    pub pomodoro_long_rest_time: u32,
    /// Number of work sections per rotation
    pub long_rest_time_interval: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Preset::Default.settings()
    }
}

impl PomodoroSettings {
    /// Returns the configured length of a section in seconds.
    pub fn section_length(&self, section: Section) -> f64 {
        let secs = match section {
            Section::Work => self.pomodoro_study_time,
            Section::ShortPause => self.pomodoro_rest_time,
            Section::LongPause => self.pomodoro_long_rest_time,
        };
        f64::from(secs)
    }

    /// Long break interval clamped to at least 1.
    pub fn long_rest_interval(&self) -> u32 {
        self.long_rest_time_interval.max(1)
    }

    /// Validates the durations and interval.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range(
            "pomodoro_study_time",
            u64::from(self.pomodoro_study_time),
            5 * 60,
            180 * 60,
        )?;
        check_range(
            "pomodoro_rest_time",
            u64::from(self.pomodoro_rest_time),
            60,
            u64::from(u32::MAX),
        )?;
        check_range(
            "pomodoro_long_rest_time",
            u64::from(self.pomodoro_long_rest_time),
            60,
            u64::from(u32::MAX),
        )?;
        check_range(
            "long_rest_time_interval",
            u64::from(self.long_rest_time_interval),
            1,
            10,
        )?;
        Ok(())
    }
}

// ============================================================================
// Preset
// ============================================================================

/// Named duration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// 25 / 5 / 15 minutes
    Default,
    /// 15 / 5 / 15 minutes
    Easy,
    /// 40 / 10 / 30 minutes
    Advanced,
    /// 50 / 10 / 30 minutes
    Workaholic,
}

impl Preset {
    /// All presets in display order.
    pub const ALL: [Preset; 4] = [
        Preset::Default,
        Preset::Easy,
        Preset::Advanced,
        Preset::Workaholic,
    ];

    /// Returns the preset name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::Easy => "easy",
            Preset::Advanced => "advanced",
            Preset::Workaholic => "workaholic",
        }
    }

    /// Returns the durations of this preset.
    pub fn settings(&self) -> PomodoroSettings {
        let (study, rest, long_rest) = match self {
            Preset::Default => (25, 5, 15),
            Preset::Easy => (15, 5, 15),
            Preset::Advanced => (40, 10, 30),
            Preset::Workaholic => (50, 10, 30),
        };
        PomodoroSettings {
            pomodoro_study_time: study * 60,
            pomodoro_rest_time: rest * 60,
            pomodoro_long_rest_time: long_rest * 60,
            long_rest_time_interval: 3,
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownPreset(s.to_string()))
    }
}

// ============================================================================
// AdaptiveTicking
// ============================================================================

/// Tick granularity settings.
///
/// While the client is not visible the ticker may wake up less often.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveTicking {
    /// Whether the background rate is used when the client is hidden
    pub enabled: bool,
    /// Tick interval while visible, in milliseconds
    pub base_rate_ms: u64,
    /// Tick interval while hidden, in milliseconds
    pub background_rate_ms: u64,
}

impl Default for AdaptiveTicking {
    fn default() -> Self {
        Self {
            enabled: true,
            base_rate_ms: 1000,
            background_rate_ms: 10_000,
        }
    }
}

impl AdaptiveTicking {
    /// Returns the tick interval in milliseconds for the given visibility.
    pub fn tick_rate_ms(&self, visible: bool) -> u64 {
        if self.enabled && !visible {
            self.background_rate_ms
        } else {
            self.base_rate_ms
        }
    }
}

// ============================================================================
// TaskSettings
// ============================================================================

/// Task list behaviour tied to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Remove completed tasks whenever the current section changes
    pub remove_completed_tasks: bool,
}

// ============================================================================
// Settings
// ============================================================================

fn default_max_tick_delta_secs() -> u64 {
    60
}

/// Everything the scheduling core reads from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Section durations and rotation
    pub pomodoro: PomodoroSettings,
    /// Behaviour when a section reaches its length
    pub section_end_action: SectionEndAction,
    /// Tick granularity
    pub adaptive_ticking: AdaptiveTicking,
    /// Task list behaviour
    pub tasks: TaskSettings,
    /// Upper bound for the elapsed time a single tick may add, in seconds
    #[serde(default = "default_max_tick_delta_secs")]
    pub max_tick_delta_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro: PomodoroSettings::default(),
            section_end_action: SectionEndAction::default(),
            adaptive_ticking: AdaptiveTicking::default(),
            tasks: TaskSettings::default(),
            max_tick_delta_secs: default_max_tick_delta_secs(),
        }
    }
}

impl Settings {
    /// Creates settings from a preset with all other values at their defaults.
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            pomodoro: preset.settings(),
            ..Self::default()
        }
    }

    /// Sets the end-of-section policy.
    pub fn with_section_end_action(mut self, action: SectionEndAction) -> Self {
        self.section_end_action = action;
        self
    }

    /// Sets the visible tick interval.
    pub fn with_base_rate_ms(mut self, rate_ms: u64) -> Self {
        self.adaptive_ticking.base_rate_ms = rate_ms;
        self
    }

    /// Enables or disables removal of completed tasks on section change.
    pub fn with_remove_completed_tasks(mut self, enabled: bool) -> Self {
        self.tasks.remove_completed_tasks = enabled;
        self
    }

    /// Validates every field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.pomodoro.validate()?;
        check_range(
            "adaptive_ticking.base_rate_ms",
            self.adaptive_ticking.base_rate_ms,
            1,
            u64::from(u32::MAX),
        )?;
        check_range(
            "adaptive_ticking.background_rate_ms",
            self.adaptive_ticking.background_rate_ms,
            1,
            u64::from(u32::MAX),
        )?;
        check_range(
            "max_tick_delta_secs",
            self.max_tick_delta_secs,
            1,
            24 * 60 * 60,
        )?;
        Ok(())
    }

    /// Loads and validates settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Loads settings from `path` if it exists, otherwise returns defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default settings file location (`~/.pomodoro-ticker/settings.json`).
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let home = dirs::home_dir().ok_or(SettingsError::NoHomeDir)?;
        Ok(home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), SettingsError> {
    if value < min || value > max {
        return Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
