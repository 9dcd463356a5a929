//! Merge of `tool_used` events into a session's tool-run table.
//!
//! One tool invocation is reported several times (`running`, then
//! `completed` or `error`) under the same `tool_run_id`. Each report is merged
//! into a single [`ToolRunState`]:
//!
//! - descriptive fields and `status` are last-write-wins;
//! - `details` is shallow-merged, new keys overwrite and old keys stay;
//! - `completed_at` is set once, the first time a terminal status is seen,
//!   and is never cleared or moved afterwards (a late `running` report is
//!   accepted without retracting it).
//!
//! Entries are never removed.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::event::ToolUsedData;
use crate::model::tool_run::{ToolRunState, ToolRunTable};

/// What a single `tool_used` application did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRunChange {
    /// A new run was inserted.
    Inserted,
    /// An existing run changed.
    Updated,
    /// The event was already reflected in the table.
    Unchanged,
}

impl ToolRunChange {
    /// Returns `true` if the table was modified.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Apply one `tool_used` event to `table` in place.
pub fn apply_tool_used(
    table: &mut ToolRunTable,
    event: &ToolUsedData,
    now: DateTime<Utc>,
) -> ToolRunChange {
    let Some(existing) = table.get_mut(&event.tool_run_id) else {
        let state = ToolRunState {
            tool_run_id: event.tool_run_id.clone(),
            tool_name: event.tool_name.clone(),
            icon: event.icon.clone(),
            description: event.description.clone(),
            status: event.status,
            details: event.details.clone(),
            started_at: now,
            completed_at: event.status.is_terminal().then_some(now),
        };
        trace!(tool_run_id = %event.tool_run_id, status = %event.status, "tool run inserted");
        table.insert(event.tool_run_id.clone(), state);
        return ToolRunChange::Inserted;
    };

    let mut merged = existing.clone();
    merged.tool_name.clone_from(&event.tool_name);
    merged.icon.clone_from(&event.icon);
    merged.description.clone_from(&event.description);
    merged.status = event.status;
    for (key, value) in &event.details {
        merged.details.insert(key.clone(), value.clone());
    }
    if merged.completed_at.is_none() && event.status.is_terminal() {
        merged.completed_at = Some(now);
    }

    if merged == *existing {
        return ToolRunChange::Unchanged;
    }
    trace!(tool_run_id = %event.tool_run_id, status = %event.status, "tool run updated");
    *existing = merged;
    ToolRunChange::Updated
}

/// Pure form of [`apply_tool_used`]: consumes a table and returns the
/// updated one.
#[must_use]
pub fn apply(mut table: ToolRunTable, event: &ToolUsedData, now: DateTime<Utc>) -> ToolRunTable {
    apply_tool_used(&mut table, event, now);
    table
}
