//! `wm diff`: structural diff of two work item snapshots.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use waymark_core::diff::{KeyedChange, Keyed, SimpleChange, WorkItemDiff, diff};
use waymark_core::model::{Scalar, WorkItem};

use super::read_input;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// The earlier snapshot (JSON work item). `-` reads stdin.
    pub before: PathBuf,

    /// The later snapshot (JSON work item).
    pub after: PathBuf,

    /// Exit with status 1 when the snapshots differ.
    #[arg(long)]
    pub exit_code: bool,
}

/// The diff together with what was compared.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub before_id: String,
    pub after_id: String,
    pub changed_fields: Vec<&'static str>,
    pub diff: WorkItemDiff,
}

/// Execute `wm diff <before> <after>`.
///
/// Returns `true` when the snapshots differ.
///
/// # Errors
///
/// Returns an error if either snapshot cannot be read or decoded.
pub fn run_diff(args: &DiffArgs, output: OutputMode) -> Result<bool> {
    let before = load_item(&args.before)?;
    let after = load_item(&args.after)?;

    let changes = diff(&before, &after);
    let report = DiffReport {
        before_id: before.id,
        after_id: after.id,
        changed_fields: changes.changed_fields(),
        diff: changes,
    };

    render_mode(output, &report, render_diff_text, render_diff_pretty)?;
    Ok(!report.changed_fields.is_empty())
}

fn load_item(path: &Path) -> Result<WorkItem> {
    let raw = read_input(path)?;
    WorkItem::from_json(&raw).with_context(|| format!("Failed to decode {}", path.display()))
}

fn scalar_or_unset(value: Option<&Scalar>) -> String {
    value.map_or_else(|| "(unset)".to_string(), ToString::to_string)
}

fn optional_or_unset(value: Option<&String>) -> String {
    value.map_or_else(|| "(unset)".to_string(), Clone::clone)
}

/// One line per changed field, followed by `+`/`-`/`~` element lines.
fn render_diff_text(report: &DiffReport, w: &mut dyn Write) -> std::io::Result<()> {
    let d = &report.diff;
    if report.changed_fields.is_empty() {
        return writeln!(w, "no changes");
    }

    write_simple(w, "title", d.title.as_ref())?;
    write_simple(w, "description", d.description.as_ref())?;
    write_simple(w, "type", d.item_type.as_ref())?;
    if let Some(change) = &d.parent_id {
        writeln!(
            w,
            "parent_id: {} -> {}",
            optional_or_unset(change.from.as_ref()),
            optional_or_unset(change.to.as_ref())
        )?;
    }
    write_simple(w, "validation_status", d.validation_status.as_ref())?;

    for (key, change) in &d.attributes {
        writeln!(
            w,
            "attributes.{key}: {} -> {}",
            scalar_or_unset(change.from.as_ref()),
            scalar_or_unset(change.to.as_ref())
        )?;
    }

    if let Some(change) = &d.acceptance_criteria {
        writeln!(
            w,
            "acceptance_criteria: +{} -{} ={}",
            change.added.len(),
            change.removed.len(),
            change.unchanged.len()
        )?;
        for item in &change.added {
            writeln!(w, "  + {item}")?;
        }
        for item in &change.removed {
            writeln!(w, "  - {item}")?;
        }
    }

    if let Some(change) = &d.diagrams {
        write_keyed(w, "diagrams", change, |diagram| diagram.title.as_str())?;
    }
    if let Some(change) = &d.test_cases {
        write_keyed(w, "test_cases", change, |case| case.title.as_str())?;
    }
    Ok(())
}

fn write_simple<T: Display>(
    w: &mut dyn Write,
    field: &str,
    change: Option<&SimpleChange<T>>,
) -> std::io::Result<()> {
    match change {
        Some(change) => writeln!(w, "{field}: {} -> {}", change.from, change.to),
        None => Ok(()),
    }
}

fn write_keyed<T: Keyed>(
    w: &mut dyn Write,
    field: &str,
    change: &KeyedChange<T>,
    title: impl Fn(&T) -> &str,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{field}: +{} -{} ~{} ={}",
        change.added.len(),
        change.removed.len(),
        change.modified.len(),
        change.unchanged.len()
    )?;
    for item in &change.added {
        writeln!(w, "  + {} {}", item.key(), title(item))?;
    }
    for item in &change.removed {
        writeln!(w, "  - {} {}", item.key(), title(item))?;
    }
    for pair in &change.modified {
        writeln!(w, "  ~ {} {}", pair.after.key(), title(&pair.after))?;
    }
    Ok(())
}

fn render_diff_pretty(report: &DiffReport, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = if report.before_id == report.after_id {
        format!("Diff {}", report.before_id)
    } else {
        format!("Diff {} → {}", report.before_id, report.after_id)
    };
    pretty_section(w, &heading)?;

    if report.changed_fields.is_empty() {
        writeln!(w, "No changes.")?;
        return pretty_rule(w);
    }

    pretty_kv(w, "changed", report.changed_fields.join(", "))?;
    pretty_rule(w)?;
    render_diff_text(report, w)?;
    pretty_rule(w)
}
