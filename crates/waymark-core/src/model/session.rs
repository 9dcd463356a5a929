//! The per-request session aggregate produced by the fold.
//!
//! A [`Session`] is created on the first shape-affecting event routed to it
//! and is only ever mutated by folding later events for the same session id.
//! The core never deletes sessions; retention is a caller policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::tool_run::{ToolRunState, ToolRunTable};
use crate::event::{AgentPlanData, AgentStartData};

/// Identifier of a session.
///
/// Live sessions use a caller-supplied id; replayed sessions use an id
/// synthesized from the history timestamp and ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A reasoning-timeline entry: either an agent starting or an agent plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentActivity {
    AgentStart(AgentStartData),
    AgentPlan(AgentPlanData),
}

impl AgentActivity {
    /// Name of the agent that produced the entry.
    #[must_use]
    pub fn agent(&self) -> &str {
        match self {
            Self::AgentStart(d) => &d.agent,
            Self::AgentPlan(d) => &d.agent,
        }
    }
}

/// One entry of a session's ordered agent log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    /// Synthetic id, unique within the session (`<session>:agent:<ordinal>`).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub activity: AgentActivity,
}

/// Everything folded for a single user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Text of the first `user_request` seen for this session.
    #[serde(default)]
    pub user_query: Option<String>,
    /// Session creation time.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tool_runs: ToolRunTable,
    #[serde(default)]
    pub agent_events: Vec<AgentLogEntry>,
    /// Presentation flag; set by caller policy, never computed by the fold.
    #[serde(default)]
    pub is_expanded: bool,
    /// Bumped each time folding actually changes this session.
    #[serde(default)]
    pub revision: u64,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: SessionId, timestamp: DateTime<Utc>, is_expanded: bool) -> Self {
        Self {
            id,
            user_query: None,
            timestamp,
            tool_runs: ToolRunTable::new(),
            agent_events: Vec::new(),
            is_expanded,
            revision: 0,
        }
    }

    /// The user query, or `placeholder` when no request was recorded.
    #[must_use]
    pub fn user_query_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.user_query.as_deref().unwrap_or(placeholder)
    }

    /// Tool runs in display order: by `started_at`, then by id.
    #[must_use]
    pub fn tool_runs_by_start(&self) -> Vec<&ToolRunState> {
        let mut runs: Vec<&ToolRunState> = self.tool_runs.values().collect();
        runs.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.tool_run_id.cmp(&b.tool_run_id))
        });
        runs
    }

    /// Number of tool runs still marked running.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.tool_runs
            .values()
            .filter(|run| !run.status.is_terminal())
            .count()
    }

    pub(crate) fn next_agent_entry_id(&self) -> String {
        format!("{}:agent:{}", self.id, self.agent_events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tool_run::ToolStatus;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    fn run(id: &str, started: i64, status: ToolStatus) -> ToolRunState {
        ToolRunState {
            tool_run_id: id.to_string(),
            tool_name: "search".to_string(),
            icon: String::new(),
            description: String::new(),
            status,
            details: BTreeMap::new(),
            started_at: at(started),
            completed_at: None,
        }
    }

    #[test]
    fn placeholder_used_until_query_recorded() {
        let mut session = Session::new(SessionId::from("s1"), at(0), true);
        assert_eq!(session.user_query_or("(none)"), "(none)");
        session.user_query = Some("What breaks?".to_string());
        assert_eq!(session.user_query_or("(none)"), "What breaks?");
    }

    #[test]
    fn tool_runs_sorted_by_start_then_id() {
        let mut session = Session::new(SessionId::from("s1"), at(0), true);
        for r in [
            run("c", 5, ToolStatus::Running),
            run("b", 1, ToolStatus::Completed),
            run("a", 5, ToolStatus::Error),
        ] {
            session.tool_runs.insert(r.tool_run_id.clone(), r);
        }

        let order: Vec<&str> = session
            .tool_runs_by_start()
            .iter()
            .map(|r| r.tool_run_id.as_str())
            .collect();
        assert_eq!(order, ["b", "a", "c"]);
        assert_eq!(session.running_count(), 1);
    }

    #[test]
    fn agent_entry_ids_are_ordinal() {
        let session = Session::new(SessionId::from("live-7"), at(0), false);
        assert_eq!(session.next_agent_entry_id(), "live-7:agent:0");
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"abc\"");
    }
}
