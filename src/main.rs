//! Pomodoro Ticker CLI - a terminal Pomodoro timer
//!
//! This tool rotates through work and break sections:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after every few work sections

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use pomodoro_ticker::cli::{run_foreground, Cli, Commands, Display};
use pomodoro_ticker::schedule::{self, Schedule};
use pomodoro_ticker::settings::Settings;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Loads settings from `--config` or the default location.
fn load_settings(cli: &Cli) -> Result<Settings> {
    if let Some(path) = &cli.config {
        return Settings::load(path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()));
    }

    match Settings::default_path() {
        Ok(path) => Settings::load_or_default(&path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display())),
        Err(e) => {
            tracing::warn!(error = %e, "using default settings");
            Ok(Settings::default())
        }
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match &cli.command {
        Some(Commands::Run(args)) => {
            let settings = args.settings.apply(load_settings(&cli)?)?;
            run_foreground(settings, !args.no_autostart).await?;
        }
        Some(Commands::Schedule(args)) => {
            let settings = args.settings.apply(load_settings(&cli)?)?;
            let count = usize::try_from(args.count).context("表示件数が大きすぎます")?;
            let entries = schedule::window(Schedule::new().entries(), &settings.pomodoro, count);
            Display::show_schedule(&entries);
        }
        Some(Commands::Presets) => {
            Display::show_presets();
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(*shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
