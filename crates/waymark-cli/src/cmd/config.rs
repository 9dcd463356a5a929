//! `wm config`: show the effective configuration.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::Path;
use waymark_core::config::{EffectiveConfig, resolve_config};

use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the project config only.
    #[arg(long)]
    pub project: bool,
}

/// Execute `wm config`.
///
/// # Errors
///
/// Returns an error if either config file exists but cannot be parsed.
pub fn run_config(args: &ConfigArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mode_name = match output {
        OutputMode::Pretty => "pretty",
        OutputMode::Text => "text",
        OutputMode::Json => "json",
    };
    let effective = resolve_config(project_root, Some(mode_name))?;

    if args.project {
        let project = effective.project;
        let rendered = toml::to_string_pretty(&project).context("Failed to render config")?;
        return render_mode(
            output,
            &project,
            |_, w| write!(w, "{rendered}"),
            |_, w| write!(w, "{rendered}"),
        );
    }

    let rendered = toml::to_string_pretty(&effective.project).context("Failed to render config")?;
    render_mode(
        output,
        &effective,
        render_effective_text,
        |value, w| {
            writeln!(w, "resolved_output = \"{}\"", value.resolved_output)?;
            if let Some(out) = &value.user.output {
                writeln!(w, "user.output = \"{out}\"")?;
            }
            writeln!(w)?;
            write!(w, "{rendered}")
        },
    )
}

fn render_effective_text(value: &EffectiveConfig, w: &mut dyn Write) -> std::io::Result<()> {
    let sessions = &value.project.sessions;
    writeln!(w, "resolved_output={}", value.resolved_output)?;
    writeln!(w, "sessions.placeholder_query={}", sessions.placeholder_query)?;
    writeln!(w, "sessions.live_expanded={}", sessions.live_expanded)?;
    writeln!(w, "sessions.history_expanded={}", sessions.history_expanded)?;
    writeln!(w, "history.id_prefix={}", value.project.history.id_prefix)?;
    if let Some(out) = &value.user.output {
        writeln!(w, "user.output={out}")?;
    }
    Ok(())
}
