//! Foreground session for the `run` command.
//!
//! This module provides:
//! - Parsing of single-letter control input
//! - The session loop wiring stdin, events and snapshots to a [`TimerRuntime`]

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::display::Display;
use crate::settings::Settings;
use crate::tasks::InMemoryTaskList;
use crate::timer::{TimerCommand, TimerRuntime, TimerSnapshot};

// ============================================================================
// Input
// ============================================================================

/// What a line of user input asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Forward a command to the runtime
    Command(TimerCommand),
    /// End the session
    Quit,
}

/// Parses one line of control input.
///
/// Returns `None` for anything unrecognised.
pub fn parse_input(line: &str) -> Option<InputAction> {
    let action = match line.trim().to_ascii_lowercase().as_str() {
        "s" | "start" => InputAction::Command(TimerCommand::Start),
        "p" | "pause" => InputAction::Command(TimerCommand::Pause),
        "x" | "stop" => InputAction::Command(TimerCommand::Stop),
        "n" | "next" => InputAction::Command(TimerCommand::Advance),
        "q" | "quit" => InputAction::Quit,
        _ => return None,
    };
    Some(action)
}

// ============================================================================
// Session
// ============================================================================

/// Runs the timer in the foreground, reading commands from stdin.
pub async fn run_foreground(settings: Settings, autostart: bool) -> Result<()> {
    Display::show_controls();
    let input = BufReader::new(tokio::io::stdin());
    run_session(settings, autostart, input).await?;
    Ok(())
}

/// Runs a session reading commands from `input` until quit, end of input
/// or Ctrl-C.
///
/// Returns the snapshot of the timer after the runtime has shut down.
pub async fn run_session<R>(settings: Settings, autostart: bool, input: R) -> Result<TimerSnapshot>
where
    R: AsyncBufRead + Unpin,
{
    let (mut runtime, handle, mut snapshot_rx) =
        TimerRuntime::new(settings, InMemoryTaskList::new());
    let mut events = runtime.subscribe_events();
    let task = tokio::spawn(runtime.run());

    if autostart {
        handle.start()?;
    }

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("標準入力の読み込みに失敗しました")? else {
                    debug!("input closed");
                    break;
                };
                match parse_input(&line) {
                    Some(InputAction::Quit) => break,
                    Some(InputAction::Command(command)) => handle.send(command)?,
                    None if line.trim().is_empty() => {}
                    None => Display::show_controls(),
                }
            }
            Some(event) = events.recv() => {
                Display::show_event(&event);
            }
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                Display::show_status_line(&snapshot_rx.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    if handle.shutdown().is_err() {
        debug!("runtime already stopped");
    }
    let timer = task
        .await
        .context("タイマーの終了待ちに失敗しました")??;

    while let Ok(event) = events.try_recv() {
        Display::show_event(&event);
    }
    println!();

    Ok(TimerSnapshot::capture(&timer))
}

// ============================================================================
// Tests
// ============================================================================
