//! Rotating section schedule.
//!
//! The schedule is an ordered list of raw [`ScheduleEntry`] values whose head
//! is the current section. Section kinds follow a rotation of
//! `2 * long_rest_interval` slots: work and short breaks alternate and the
//! last slot is a long break. Readers see a fixed-size window of
//! [`ResolvedEntry`] values computed on demand from the raw list and the
//! settings.

use crate::settings::PomodoroSettings;
use crate::types::{ResolvedEntry, ScheduleEntry, Section};

/// Number of entries in the look-ahead window.
pub const WINDOW_SIZE: usize = 3;

/// Number of raw entries a new schedule starts with.
pub const INITIAL_ENTRIES: usize = 10;

// ============================================================================
// Rotation
// ============================================================================

/// Number of slots in one rotation. A zero interval is treated as 1.
pub fn rotation_len(long_rest_interval: u32) -> u64 {
    2 * u64::from(long_rest_interval.max(1))
}

/// Section kind at position `id` of the infinite rotation.
pub fn section_at(id: u64, long_rest_interval: u32) -> Section {
    let len = rotation_len(long_rest_interval);
    let index = id % len;
    if index == len - 1 {
        Section::LongPause
    } else if index % 2 == 1 {
        Section::ShortPause
    } else {
        Section::Work
    }
}

/// One full rotation of section kinds.
pub fn rotation(long_rest_interval: u32) -> Vec<Section> {
    (0..rotation_len(long_rest_interval))
        .map(|id| section_at(id, long_rest_interval))
        .collect()
}

/// Resolves an entry's section, length and remaining time.
///
/// Locked values win over the rotation and the settings.
pub fn resolve(entry: &ScheduleEntry, settings: &PomodoroSettings) -> ResolvedEntry {
    let section = entry
        .section
        .unwrap_or_else(|| section_at(entry.id, settings.long_rest_interval()));
    let length = entry
        .length
        .unwrap_or_else(|| settings.section_length(section));

    ResolvedEntry {
        id: entry.id,
        time_elapsed: entry.time_elapsed,
        length,
        section,
        time_remaining: length - entry.time_elapsed,
    }
}

/// Builds a window of exactly `size` resolved entries from a raw list.
///
/// Shorter lists are extended with fresh entries of increasing id, longer
/// ones are cut at the tail. The raw list is not touched.
pub fn window(
    entries: &[ScheduleEntry],
    settings: &PomodoroSettings,
    size: usize,
) -> Vec<ResolvedEntry> {
    let mut raw: Vec<ScheduleEntry> = entries.iter().take(size).cloned().collect();

    if raw.is_empty() && size > 0 {
        raw.push(ScheduleEntry::new(0));
    }
    while raw.len() < size {
        let next_id = raw.last().map_or(0, |e| e.id + 1);
        raw.push(ScheduleEntry::new(next_id));
    }

    raw.iter().map(|entry| resolve(entry, settings)).collect()
}

// ============================================================================
// Schedule
// ============================================================================

/// The raw schedule list. Its head is the current section.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    window_size: usize,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    /// Creates a schedule with [`INITIAL_ENTRIES`] fresh entries.
    pub fn new() -> Self {
        Self::from_entries((0..INITIAL_ENTRIES as u64).map(ScheduleEntry::new).collect())
    }

    /// Creates a schedule from an existing raw list.
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            window_size: WINDOW_SIZE,
        }
    }

    /// Raw entries, current first.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Look-ahead window of resolved entries.
    pub fn window(&self, settings: &PomodoroSettings) -> Vec<ResolvedEntry> {
        window(&self.entries, settings, self.window_size)
    }

    /// The current section, resolved.
    pub fn current(&self, settings: &PomodoroSettings) -> ResolvedEntry {
        match self.entries.first() {
            Some(entry) => resolve(entry, settings),
            None => resolve(&ScheduleEntry::new(0), settings),
        }
    }

    /// Identity of the current section.
    pub fn current_id(&self) -> u64 {
        self.entries.first().map_or(0, |e| e.id)
    }

    /// Mutable access to the current raw entry, creating one if the list is empty.
    pub fn current_mut(&mut self) -> &mut ScheduleEntry {
        if self.entries.is_empty() {
            self.entries.push(ScheduleEntry::new(0));
        }
        &mut self.entries[0]
    }

    /// Drops the current entry and appends a new one at the tail.
    ///
    /// Returns the id of the new current entry.
    pub fn advance(&mut self) -> u64 {
        let next_id = self.entries.last().map_or(0, |e| e.id + 1);
        if !self.entries.is_empty() {
            self.entries.remove(0);
        }
        self.entries.push(ScheduleEntry::new(next_id));

        tracing::debug!(current = self.current_id(), appended = next_id, "schedule advanced");
        self.current_id()
    }

    /// Locks the current entry's length and section.
    pub fn lock_current(&mut self, length: f64, section: Section) {
        let entry = self.current_mut();
        entry.length = Some(length);
        entry.section = Some(section);
    }

    /// Clears any lock on the current entry.
    pub fn unlock_current(&mut self) {
        let entry = self.current_mut();
        entry.length = None;
        entry.section = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
