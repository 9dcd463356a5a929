//! Subcommand handlers and the session rendering they share.

pub mod config;
pub mod diff;
pub mod fold;
pub mod replay;

use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::path::Path;
use waymark_core::model::session::{AgentActivity, Session};

use crate::output::{pretty_kv, pretty_rule, pretty_section};

/// Read a whole input file; `-` reads stdin.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn activity_label(activity: &AgentActivity) -> (&'static str, Option<&str>) {
    match activity {
        AgentActivity::AgentStart(d) => ("start", d.message.as_deref()),
        AgentActivity::AgentPlan(d) => ("plan", d.message.as_deref()),
    }
}

/// Compact, line-oriented rendering. Collapsed sessions print their header only.
pub fn render_session_text(
    session: &Session,
    placeholder: &str,
    w: &mut dyn Write,
) -> io::Result<()> {
    writeln!(
        w,
        "session {} rev={} runs={} running={} expanded={}",
        session.id,
        session.revision,
        session.tool_runs.len(),
        session.running_count(),
        session.is_expanded
    )?;
    writeln!(w, "  query: {}", session.user_query_or(placeholder))?;
    if !session.is_expanded {
        return Ok(());
    }

    for run in session.tool_runs_by_start() {
        write!(
            w,
            "  tool {} {} {} started={}",
            run.tool_run_id,
            run.tool_name,
            run.status,
            run.started_at.to_rfc3339()
        )?;
        if let Some(done) = run.completed_at {
            write!(w, " completed={}", done.to_rfc3339())?;
        }
        writeln!(w)?;
    }

    for entry in &session.agent_events {
        let (kind, message) = activity_label(&entry.activity);
        write!(w, "  agent {} {kind} {}", entry.id, entry.activity.agent())?;
        if let Some(message) = message {
            write!(w, " {message}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Sectioned human rendering. Collapsed sessions print their summary only.
pub fn render_session_pretty(
    session: &Session,
    placeholder: &str,
    w: &mut dyn Write,
) -> io::Result<()> {
    let marker = if session.is_expanded { "▾" } else { "▸" };
    pretty_section(w, &format!("{marker} Session {}", session.id))?;
    pretty_kv(w, "query", session.user_query_or(placeholder))?;
    pretty_kv(
        w,
        "started",
        session.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    )?;
    pretty_kv(
        w,
        "tool runs",
        format!(
            "{} ({} running)",
            session.tool_runs.len(),
            session.running_count()
        ),
    )?;
    if !session.is_expanded {
        return writeln!(w);
    }

    if !session.tool_runs.is_empty() {
        writeln!(w)?;
        writeln!(w, "Tools")?;
        for run in session.tool_runs_by_start() {
            let elapsed = run
                .elapsed()
                .map(|d| format!(" in {}ms", d.num_milliseconds()))
                .unwrap_or_default();
            let icon = if run.icon.is_empty() { "•" } else { run.icon.as_str() };
            let label = if run.description.is_empty() {
                run.tool_name.as_str()
            } else {
                run.description.as_str()
            };
            writeln!(w, "  {icon} {:<10} {label}{elapsed}", run.status)?;
            for (key, value) in &run.details {
                writeln!(w, "      {key} = {value}")?;
            }
        }
    }

    if !session.agent_events.is_empty() {
        writeln!(w)?;
        writeln!(w, "Agents")?;
        for entry in &session.agent_events {
            let (kind, message) = activity_label(&entry.activity);
            writeln!(
                w,
                "  {} {:<5} {}{}",
                entry.timestamp.format("%H:%M:%S"),
                kind,
                entry.activity.agent(),
                message.map(|m| format!(": {m}")).unwrap_or_default()
            )?;
            if let AgentActivity::AgentPlan(plan) = &entry.activity {
                for (i, step) in plan.steps.iter().enumerate() {
                    writeln!(w, "          {}. {step}", i + 1)?;
                }
            }
        }
    }
    pretty_rule(w)?;
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use waymark_core::event::{Decoded, decode_str};
    use waymark_core::fold::{FoldContext, SessionTable};

    fn session(expanded: bool) -> Session {
        let now = Utc
            .with_ymd_and_hms(2025, 10, 9, 8, 0, 0)
            .single()
            .expect("valid timestamp");
        let mut table = SessionTable::new();
        let ctx = FoldContext::new("s1", now);
        for raw in [
            r#"{"type": "tool_used", "tool_run_id": "r1", "tool_name": "grep", "status": "completed"}"#,
            r#"{"type": "agent_plan", "agent": "planner", "message": "go", "steps": ["a", "b"]}"#,
        ] {
            let Decoded::Event(event) = decode_str(raw).expect("decode") else {
                panic!("known event");
            };
            table.apply(&event, &ctx);
        }
        table.set_expanded(&"s1".into(), expanded);
        table.into_sessions().remove(0)
    }

    fn render(f: fn(&Session, &str, &mut dyn Write) -> io::Result<()>, s: &Session) -> String {
        let mut buf = Vec::new();
        f(s, "(none)", &mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn text_lists_runs_and_agents_when_expanded() {
        let out = render(render_session_text, &session(true));
        assert!(out.starts_with("session s1 rev="));
        assert!(out.contains("  query: (none)\n"));
        assert!(out.contains("  tool r1 grep completed started=2025-10-09T08:00:00+00:00"));
        assert!(out.contains("  agent s1:agent:0 plan planner go\n"));
    }

    #[test]
    fn collapsed_sessions_render_header_only() {
        let text = render(render_session_text, &session(false));
        assert_eq!(text.lines().count(), 2);
        let pretty = render(render_session_pretty, &session(false));
        assert!(!pretty.contains("Tools"));
        assert!(pretty.contains("▸ Session s1"));
    }

    #[test]
    fn pretty_shows_plan_steps() {
        let out = render(render_session_pretty, &session(true));
        assert!(out.contains("▾ Session s1"));
        assert!(out.contains("1. a"));
        assert!(out.contains("2. b"));
    }
}
