//! Event folding.
//!
//! [`tool_run`] merges `tool_used` reports into a per-session table of tool
//! runs; [`session`] routes every event to its session and decides what it
//! does there. Folding is synchronous and deterministic: the same ordered
//! events produce the same table, and synthetic ids never depend on clocks.
//!
//! Callers that need read-while-write snapshots use the by-value [`fold`]
//! (`fold(table.clone(), ...)`) or watch the revision clocks.

pub mod session;
pub mod tool_run;

pub use session::{SessionDefaults, SessionTable};
pub use tool_run::{ToolRunChange, apply_tool_used};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::event::{Decoded, Event, EventType, decode_event};
use crate::model::session::SessionId;

/// Target and clock for one fold application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldContext {
    pub session_id: SessionId,
    pub now: DateTime<Utc>,
}

impl FoldContext {
    pub fn new(session_id: impl Into<SessionId>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            now,
        }
    }
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "signal", rename_all = "snake_case")]
pub enum FoldOutcome {
    /// The target session was created by this event.
    Created,
    /// The target session changed.
    Changed,
    /// The event was already reflected; nothing changed.
    Unchanged,
    /// An observe-only event; sessions are untouched.
    Signal(Signal),
}

impl FoldOutcome {
    /// Returns `true` if the session table changed.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Changed)
    }
}

/// Information carried by observe-only events, handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Signal {
    /// Correlation id of the backend thread.
    ThreadId(String),
    /// The impact plan body, opaque to the fold.
    ImpactPlanReady(Value),
    /// The workflow finished, with an optional closing message.
    WorkflowComplete(Option<String>),
    /// The workflow reported an error.
    Error(String),
    /// Node or model progress with no payload of interest.
    Progress(EventType),
}

impl Signal {
    /// Returns `true` for signals that end the workflow.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkflowComplete(_) | Self::Error(_))
    }
}

/// Fold one event into a table, consuming and returning it.
#[must_use]
pub fn fold(mut sessions: SessionTable, event: &Event, ctx: &FoldContext) -> SessionTable {
    sessions.apply(event, ctx);
    sessions
}

/// Decode a raw JSON event and fold it into `sessions`.
///
/// Unknown event types and malformed events leave the table untouched and
/// return `None`; malformed ones are logged at `warn`.
pub fn fold_json(sessions: &mut SessionTable, raw: Value, ctx: &FoldContext) -> Option<FoldOutcome> {
    match decode_event(raw) {
        Ok(Decoded::Event(event)) => Some(sessions.apply(&event, ctx)),
        Ok(Decoded::Unknown(raw_type)) => {
            debug!(
                session = %ctx.session_id,
                code = %ErrorCode::UnknownEventType,
                event_type = %raw_type,
                "ignoring unknown event type"
            );
            None
        }
        Err(e) => {
            warn!(
                session = %ctx.session_id,
                code = %e.error_code(),
                error = %e,
                "dropping malformed event"
            );
            None
        }
    }
}
