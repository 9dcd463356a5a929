//! `wm replay`: rebuild sessions from a persisted history file.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use waymark_core::config::load_project_config;
use waymark_core::model::session::Session;
use waymark_core::replay::replay_json;

use super::{read_input, render_session_pretty, render_session_text};
use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// History file: a JSON array of {timestamp, events} records. `-` reads stdin.
    pub path: PathBuf,

    /// Render every replayed session expanded.
    #[arg(long)]
    pub expanded: bool,
}

/// Execute `wm replay <path>`.
///
/// # Errors
///
/// Returns an error if the history cannot be read or is not a history
/// document, or if the project config is malformed.
pub fn run_replay(args: &ReplayArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = load_project_config(project_root)?;
    let mut options = project.replay_options();
    options.is_expanded |= args.expanded;

    let raw = read_input(&args.path)?;
    let sessions = replay_json(&raw, &options)
        .with_context(|| format!("Failed to replay {}", args.path.display()))?;
    info!(sessions = sessions.len(), "replayed history");

    let placeholder = project.sessions.placeholder_query.as_str();
    render_mode(
        output,
        sessions.as_slice(),
        |sessions, w| render_replay_text(sessions, placeholder, w),
        |sessions, w| render_replay_pretty(sessions, placeholder, w),
    )
}

fn render_replay_text(
    sessions: &[Session],
    placeholder: &str,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    for session in sessions {
        render_session_text(session, placeholder, w)?;
    }
    Ok(())
}

fn render_replay_pretty(
    sessions: &[Session],
    placeholder: &str,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if sessions.is_empty() {
        return writeln!(w, "No sessions in history.");
    }
    writeln!(w, "{} session(s) replayed\n", sessions.len())?;
    for session in sessions {
        render_session_pretty(session, placeholder, w)?;
    }
    Ok(())
}
