//! `wm fold`: fold a JSON-lines event stream into one live session.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use waymark_core::config::load_project_config;
use waymark_core::error::ErrorCode;
use waymark_core::event::{Decoded, decode_str};
use waymark_core::fold::{FoldContext, FoldOutcome, SessionTable, Signal};
use waymark_core::model::session::{Session, SessionId};

use super::{read_input, render_session_pretty, render_session_text};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct FoldArgs {
    /// Event stream, one JSON event per line. `-` reads stdin.
    pub path: PathBuf,

    /// Session id every event is routed to.
    #[arg(long, default_value = "live")]
    pub session: String,

    /// Pin the fold clock (RFC 3339) instead of reading the wall clock per line.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Fail on the first malformed line instead of skipping it.
    #[arg(long)]
    pub strict: bool,
}

/// What folding the stream produced.
#[derive(Debug, Serialize)]
pub struct FoldReport {
    /// The folded session; absent when no line touched it.
    pub session: Option<Session>,
    /// Observe-only signals in stream order.
    pub signals: Vec<Signal>,
    /// Lines that changed the session.
    pub applied: usize,
    /// Lines already reflected in the session.
    pub unchanged: usize,
    /// Malformed lines that were dropped.
    pub skipped: usize,
    /// Lines with an event type this build does not know.
    pub unknown: usize,
}

/// Execute `wm fold <path>`.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the project config is
/// malformed, or `--strict` is set and a line fails to decode.
pub fn run_fold(args: &FoldArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = load_project_config(project_root)?;
    let raw = read_input(&args.path)?;
    let report = fold_lines(&raw, args, SessionTable::with_defaults(project.live_defaults()))?;

    let placeholder = project.sessions.placeholder_query.as_str();
    render_mode(
        output,
        &report,
        |report, w| render_fold_text(report, placeholder, w),
        |report, w| render_fold_pretty(report, placeholder, w),
    )
}

fn fold_lines(raw: &str, args: &FoldArgs, mut table: SessionTable) -> Result<FoldReport> {
    let id = SessionId::new(args.session.as_str());
    let mut report = FoldReport {
        session: None,
        signals: Vec::new(),
        applied: 0,
        unchanged: 0,
        skipped: 0,
        unknown: 0,
    };

    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let event = match decode_str(line) {
            Ok(Decoded::Event(event)) => event,
            Ok(Decoded::Unknown(event_type)) => {
                debug!(
                    line = line_no,
                    code = %ErrorCode::UnknownEventType,
                    event_type = %event_type,
                    "ignoring unknown event type"
                );
                report.unknown += 1;
                continue;
            }
            Err(e) if args.strict => {
                return Err(e).with_context(|| format!("line {line_no}"));
            }
            Err(e) => {
                warn!(line = line_no, code = %e.error_code(), error = %e, "skipping malformed event");
                report.skipped += 1;
                continue;
            }
        };

        let now = args.at.unwrap_or_else(Utc::now);
        match table.apply(&event, &FoldContext::new(id.clone(), now)) {
            FoldOutcome::Created | FoldOutcome::Changed => report.applied += 1,
            FoldOutcome::Unchanged => report.unchanged += 1,
            FoldOutcome::Signal(signal) => report.signals.push(signal),
        }
    }

    report.session = table.get(&id).cloned();
    Ok(report)
}

fn describe_signal(signal: &Signal) -> String {
    match signal {
        Signal::ThreadId(id) => format!("thread {id}"),
        Signal::ImpactPlanReady(_) => "impact plan ready".to_string(),
        Signal::WorkflowComplete(Some(message)) => format!("workflow complete: {message}"),
        Signal::WorkflowComplete(None) => "workflow complete".to_string(),
        Signal::Error(message) => format!("error: {message}"),
        Signal::Progress(event_type) => format!("progress {event_type}"),
    }
}

fn render_fold_text(report: &FoldReport, placeholder: &str, w: &mut dyn Write) -> std::io::Result<()> {
    if let Some(session) = &report.session {
        render_session_text(session, placeholder, w)?;
    }
    for signal in &report.signals {
        writeln!(w, "signal {}", describe_signal(signal))?;
    }
    writeln!(
        w,
        "applied={} unchanged={} skipped={} unknown={}",
        report.applied, report.unchanged, report.skipped, report.unknown
    )
}

fn render_fold_pretty(
    report: &FoldReport,
    placeholder: &str,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    match &report.session {
        Some(session) => render_session_pretty(session, placeholder, w)?,
        None => writeln!(w, "No session state was produced.\n")?,
    }

    let progress = report
        .signals
        .iter()
        .filter(|s| matches!(s, Signal::Progress(_)))
        .count();
    let notable: Vec<&Signal> = report
        .signals
        .iter()
        .filter(|s| !matches!(s, Signal::Progress(_)))
        .collect();

    pretty_section(w, "Stream")?;
    pretty_kv(w, "applied", report.applied.to_string())?;
    pretty_kv(w, "unchanged", report.unchanged.to_string())?;
    pretty_kv(w, "skipped", report.skipped.to_string())?;
    pretty_kv(w, "unknown", report.unknown.to_string())?;
    pretty_kv(w, "progress", progress.to_string())?;
    for signal in notable {
        let marker = if signal.is_terminal() { "■" } else { "·" };
        writeln!(w, "  {marker} {}", describe_signal(signal))?;
    }
    Ok(())
}
