//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("設定ファイルを読み込めません: {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`super::Settings`].
    #[error("設定ファイルの形式が不正です: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("{field} は {min}-{max} の範囲で指定してください (指定値: {value})")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// Value that was supplied
        value: u64,
        /// Inclusive lower bound
        min: u64,
        /// Inclusive upper bound
        max: u64,
    },

    /// No preset with this name exists.
    #[error("不明なプリセットです: {0}")]
    UnknownPreset(String),

    /// The home directory could not be determined.
    #[error("ホームディレクトリが見つかりません")]
    NoHomeDir,
}

impl SettingsError {
    /// Returns true if the error came from the file system or parser.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse(_))
    }
}
