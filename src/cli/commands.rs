//! Command definitions for the Pomodoro ticker CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::{Preset, Settings, SettingsError};
use crate::types::SectionEndAction;

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro ticker - a rotating work/break schedule in the terminal
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro-ticker",
    version,
    about = "作業と休憩を自動で切り替えるポモドーロタイマー",
    long_about = "作業・短い休憩・長い休憩のローテーションを管理するポモドーロタイマー。\n\
                  run コマンドはフォアグラウンドで動作し、標準入力から操作します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (default: ~/.pomodoro-ticker/settings.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the timer in the foreground (s: start, p: pause, x: stop, n: next, q: quit)
    Run(RunArgs),

    /// Show the upcoming sections
    Schedule(ScheduleArgs),

    /// List duration presets
    Presets,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Settings Overrides
// ============================================================================

/// Flags overriding values from the settings file
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Duration preset (default, easy, advanced, workaholic)
    #[arg(short, long)]
    pub preset: Option<Preset>,

    /// Work duration in minutes (5-180)
    #[arg(long, value_parser = clap::value_parser!(u32).range(5..=180))]
    pub study: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub rest: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_rest: Option<u32>,

    /// Work sections before a long break (1-10)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub interval: Option<u32>,

    /// What to do when a section ends (stop, skip)
    #[arg(short, long)]
    pub end_action: Option<SectionEndAction>,

    /// Tick interval in milliseconds while visible
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    pub tick_ms: Option<u64>,
}

impl SettingsArgs {
    /// Applies the overrides on top of `settings` and validates the result.
    ///
    /// A preset replaces all durations; individual duration flags are
    /// applied after it.
    pub fn apply(&self, mut settings: Settings) -> Result<Settings, SettingsError> {
        if let Some(preset) = self.preset {
            settings.pomodoro = preset.settings();
        }
        if let Some(study) = self.study {
            settings.pomodoro.pomodoro_study_time = study * 60;
        }
        if let Some(rest) = self.rest {
            settings.pomodoro.pomodoro_rest_time = rest * 60;
        }
        if let Some(long_rest) = self.long_rest {
            settings.pomodoro.pomodoro_long_rest_time = long_rest * 60;
        }
        if let Some(interval) = self.interval {
            settings.pomodoro.long_rest_time_interval = interval;
        }
        if let Some(action) = self.end_action {
            settings.section_end_action = action;
        }
        if let Some(tick_ms) = self.tick_ms {
            settings.adaptive_ticking.base_rate_ms = tick_ms;
        }

        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Run / Schedule Arguments
// ============================================================================

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Settings overrides
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Do not start the first section automatically
    #[arg(long)]
    pub no_autostart: bool,
}

/// Arguments for the schedule command
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Settings overrides
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Number of sections to show (1-50)
    #[arg(
        short = 'n',
        long,
        default_value = "3",
        value_parser = clap::value_parser!(u64).range(1..=50)
    )]
    pub count: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["pomodoro-ticker"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.config.is_none());
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["pomodoro-ticker", "-v", "presets"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Presets)));
        }

        #[test]
        fn test_parse_global_config() {
            let cli = Cli::parse_from(["pomodoro-ticker", "schedule", "--config", "/tmp/s.json"]);
            assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        }

        #[test]
        fn test_parse_completions_bash() {
            let cli = Cli::parse_from(["pomodoro-ticker", "completions", "bash"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Bash);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Run Command Tests
    // ------------------------------------------------------------------------

    mod run_args_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::parse_from(["pomodoro-ticker", "run"]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert!(!args.no_autostart);
                    assert!(args.settings.preset.is_none());
                    assert!(args.settings.end_action.is_none());
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_run_with_options() {
            let cli = Cli::parse_from([
                "pomodoro-ticker",
                "run",
                "--preset",
                "easy",
                "--study",
                "30",
                "--end-action",
                "skip",
                "--tick-ms",
                "500",
                "--no-autostart",
            ]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert_eq!(args.settings.preset, Some(Preset::Easy));
                    assert_eq!(args.settings.study, Some(30));
                    assert_eq!(args.settings.end_action, Some(SectionEndAction::Skip));
                    assert_eq!(args.settings.tick_ms, Some(500));
                    assert!(args.no_autostart);
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_study_out_of_range() {
            let result = Cli::try_parse_from(["pomodoro-ticker", "run", "--study", "4"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_interval_zero() {
            let result = Cli::try_parse_from(["pomodoro-ticker", "run", "--interval", "0"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_unknown_preset() {
            let result = Cli::try_parse_from(["pomodoro-ticker", "run", "--preset", "lazy"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_unknown_end_action() {
            let result = Cli::try_parse_from(["pomodoro-ticker", "run", "--end-action", "later"]);
            assert!(result.is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Schedule Command Tests
    // ------------------------------------------------------------------------

    mod schedule_args_tests {
        use super::*;

        #[test]
        fn test_parse_schedule_default_count() {
            let cli = Cli::parse_from(["pomodoro-ticker", "schedule"]);
            match cli.command {
                Some(Commands::Schedule(args)) => assert_eq!(args.count, 3),
                _ => panic!("Expected Schedule command"),
            }
        }

        #[test]
        fn test_parse_schedule_count() {
            let cli = Cli::parse_from(["pomodoro-ticker", "schedule", "-n", "8", "-i", "4"]);
            match cli.command {
                Some(Commands::Schedule(args)) => {
                    assert_eq!(args.count, 8);
                    assert_eq!(args.settings.interval, Some(4));
                }
                _ => panic!("Expected Schedule command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Settings Override Tests
    // ------------------------------------------------------------------------

    mod settings_args_tests {
        use super::*;

        #[test]
        fn test_apply_no_overrides() {
            let settings = SettingsArgs::default().apply(Settings::default()).unwrap();
            assert_eq!(settings, Settings::default());
        }

        #[test]
        fn test_apply_preset_then_study() {
            let args = SettingsArgs {
                preset: Some(Preset::Advanced),
                study: Some(45),
                ..SettingsArgs::default()
            };
            let settings = args.apply(Settings::default()).unwrap();

            assert_eq!(settings.pomodoro.pomodoro_study_time, 45 * 60);
            assert_eq!(settings.pomodoro.pomodoro_rest_time, 10 * 60);
            assert_eq!(settings.pomodoro.pomodoro_long_rest_time, 30 * 60);
        }

        #[test]
        fn test_apply_end_action_and_tick() {
            let args = SettingsArgs {
                end_action: Some(SectionEndAction::Skip),
                tick_ms: Some(200),
                interval: Some(2),
                ..SettingsArgs::default()
            };
            let settings = args.apply(Settings::default()).unwrap();

            assert_eq!(settings.section_end_action, SectionEndAction::Skip);
            assert_eq!(settings.adaptive_ticking.base_rate_ms, 200);
            assert_eq!(settings.pomodoro.long_rest_time_interval, 2);
        }

        #[test]
        fn test_apply_validates_file_values() {
            let mut from_file = Settings::default();
            from_file.max_tick_delta_secs = 0;

            assert!(SettingsArgs::default().apply(from_file).is_err());
        }
    }
}
