//! Timer error types.

use thiserror::Error;

use crate::settings::SettingsError;
use crate::types::TimerState;

/// Errors returned by timer commands.
///
/// These only reject commands that make no sense in the current state; the
/// ticking itself never fails.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Start requested while the timer is already running.
    #[error("タイマーは既に実行中です")]
    AlreadyRunning,

    /// Pause or stop requested while nothing is running.
    #[error("タイマーは実行されていません (状態: {})", .0.as_str())]
    NotRunning(TimerState),

    /// New settings failed validation.
    #[error("設定が不正です: {0}")]
    InvalidSettings(#[from] SettingsError),
}
