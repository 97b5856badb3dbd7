//! Display utilities for the Pomodoro ticker CLI.
//!
//! This module provides formatted output for:
//! - Lifecycle events
//! - The live status line
//! - Schedule and preset listings
//! - Error messages

use std::io::Write;

use crate::events::{Event, EventType};
use crate::settings::Preset;
use crate::timer::TimerSnapshot;
use crate::types::{ResolvedEntry, Section, TimerState};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Prints one line for a lifecycle event.
    ///
    /// Events that carry no user-facing meaning are skipped.
    pub fn show_event(event: &Event) {
        if let Some(line) = Self::event_line(event) {
            // Clear the status line first
            println!("\r\x1b[2K{}", line);
        }
    }

    /// Redraws the status line in place.
    pub fn show_status_line(snapshot: &TimerSnapshot) {
        print!("\r\x1b[2K{}", Self::status_line(snapshot));
        let _ = std::io::stdout().flush();
    }

    /// Shows a schedule window, current section first.
    pub fn show_schedule(entries: &[ResolvedEntry]) {
        println!("スケジュール");
        println!("─────────────────────────────");
        for (index, entry) in entries.iter().enumerate() {
            println!("{}", Self::schedule_row(index, entry));
        }
    }

    /// Shows the available presets.
    pub fn show_presets() {
        println!("プリセット一覧");
        println!("─────────────────────────────");
        for preset in Preset::ALL {
            let settings = preset.settings();
            println!(
                "{:<11} 作業 {}分 / 休憩 {}分 / 長い休憩 {}分 / 間隔 {}",
                preset.as_str(),
                settings.pomodoro_study_time / 60,
                settings.pomodoro_rest_time / 60,
                settings.pomodoro_long_rest_time / 60,
                settings.long_rest_time_interval,
            );
        }
    }

    /// Shows the key bindings of the run command.
    pub fn show_controls() {
        println!("操作: s=開始/再開  p=一時停止  x=停止  n=次へ  q=終了");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------------

    /// Formats remaining seconds as (minutes, seconds).
    pub fn format_time(total_seconds: u64) -> (u64, u64) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }

    fn clock(total_seconds: u64) -> String {
        let (minutes, seconds) = Self::format_time(total_seconds);
        format!("{}:{:02}", minutes, seconds)
    }

    /// Japanese label for a section.
    pub fn section_label(section: Section) -> &'static str {
        match section {
            Section::Work => "作業",
            Section::ShortPause => "休憩",
            Section::LongPause => "長い休憩",
        }
    }

    /// Japanese label for a timer state.
    pub fn state_label(state: TimerState) -> &'static str {
        match state {
            TimerState::Stopped => "停止中",
            TimerState::Running => "実行中",
            TimerState::Paused => "一時停止中",
            TimerState::Completed => "完了",
        }
    }

    fn status_line(snapshot: &TimerSnapshot) -> String {
        let current = &snapshot.current;
        let next = snapshot
            .upcoming
            .get(1)
            .map(|entry| format!("  次: {}", Self::section_label(entry.section)))
            .unwrap_or_default();

        format!(
            "[{}] {} 残り {}{}",
            Self::state_label(snapshot.state),
            Self::section_label(current.section),
            Self::clock(current.remaining_seconds()),
            next,
        )
    }

    fn schedule_row(index: usize, entry: &ResolvedEntry) -> String {
        let marker = if index == 0 { ">" } else { " " };
        format!(
            "{} #{:<3} {:<8} {}",
            marker,
            entry.id,
            Self::section_label(entry.section),
            Self::clock(entry.remaining_seconds()),
        )
    }

    fn event_line(event: &Event) -> Option<String> {
        let line = match event.event_type {
            EventType::TimerStart => "* タイマーを開始しました".to_string(),
            EventType::TimerPause => "|| タイマーを一時停止しました".to_string(),
            EventType::TimerStop => "[] タイマーを停止しました".to_string(),
            EventType::TimerFinish => {
                let section = event
                    .data
                    .as_ref()
                    .and_then(|data| data.get("section"))
                    .and_then(|value| serde_json::from_value::<Section>(value.clone()).ok());
                match section {
                    Some(section) => format!("! {}が終了しました", Self::section_label(section)),
                    None => "! セクションが終了しました".to_string(),
                }
            }
            EventType::ScheduleAdvanceManual => ">> 次のセクションへ進みました".to_string(),
            EventType::ScheduleAdvanceAuto => ">> 自動で次のセクションへ進みました".to_string(),
            EventType::AppError => {
                let message = event
                    .data
                    .as_ref()
                    .and_then(|data| data.as_str())
                    .unwrap_or("不明なエラー");
                format!("エラー: {}", message)
            }
            EventType::AppStarted
            | EventType::FocusGain
            | EventType::FocusLost
            | EventType::NotificationsEnabled
            | EventType::Other => return None,
        };
        Some(line)
    }
}

// ============================================================================
// Tests
// ============================================================================
