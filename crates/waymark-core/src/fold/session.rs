//! The session table: routes events to sessions and folds them in.
//!
//! Every application names its target session explicitly through a
//! [`FoldContext`]; there is no ambient "current session". Which session the
//! caller treats as active, and which ones are expanded, is caller policy
//! expressed through [`SessionTable::start_session`] and the collapse
//! helpers.
//!
//! # Change detection
//!
//! The table keeps a revision clock, and so does every session. Both are
//! bumped only when an application actually changes state, so callers can
//! detect updates without comparing sessions.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::tool_run::apply_tool_used;
use super::{FoldContext, FoldOutcome, Signal};
use crate::event::Event;
use crate::model::session::{AgentActivity, AgentLogEntry, Session, SessionId};

/// Defaults applied to sessions the table creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults {
    /// Initial `is_expanded` flag of new sessions.
    pub is_expanded: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self { is_expanded: true }
    }
}

/// All sessions tracked by one caller, keyed by session id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTable {
    sessions: BTreeMap<SessionId, Session>,
    revision: u64,
    defaults: SessionDefaults,
}

impl SessionTable {
    /// Create an empty table whose new sessions start expanded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with explicit defaults for new sessions.
    #[must_use]
    pub fn with_defaults(defaults: SessionDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Fold one event into the session named by `ctx`.
    ///
    /// Shape-affecting events create the session on first use and report
    /// [`FoldOutcome::Created`], [`FoldOutcome::Changed`] or
    /// [`FoldOutcome::Unchanged`]. Observe-only events never touch the table
    /// and come back as a [`FoldOutcome::Signal`].
    pub fn apply(&mut self, event: &Event, ctx: &FoldContext) -> FoldOutcome {
        match event {
            Event::UserRequest(data) => self.apply_to(ctx, |session| {
                if session.user_query.is_some() {
                    trace!(session = %session.id, "ignoring repeated user_request");
                    return false;
                }
                session.user_query = Some(data.content.clone());
                true
            }),
            Event::AgentStart(data) => self.apply_to(ctx, |session| {
                append_activity(session, AgentActivity::AgentStart(data.clone()), ctx);
                true
            }),
            Event::AgentPlan(data) => self.apply_to(ctx, |session| {
                append_activity(session, AgentActivity::AgentPlan(data.clone()), ctx);
                true
            }),
            Event::ToolUsed(data) => self.apply_to(ctx, |session| {
                apply_tool_used(&mut session.tool_runs, data, ctx.now).is_change()
            }),
            Event::ThreadId(data) => FoldOutcome::Signal(Signal::ThreadId(data.thread_id.clone())),
            Event::ImpactPlanReady(data) => {
                FoldOutcome::Signal(Signal::ImpactPlanReady(data.plan.clone()))
            }
            Event::WorkflowComplete(data) => {
                FoldOutcome::Signal(Signal::WorkflowComplete(data.message.clone()))
            }
            Event::Error(data) => FoldOutcome::Signal(Signal::Error(data.message.clone())),
            Event::NodeStart(_)
            | Event::NodeEnd(_)
            | Event::LlmStart(_)
            | Event::LlmToken(_)
            | Event::LlmEnd(_) => FoldOutcome::Signal(Signal::Progress(event.event_type())),
        }
    }

    /// Open a new session for a fresh user request.
    ///
    /// Returns [`FoldOutcome::Unchanged`] if a session with this id already
    /// exists; its query is left as it was.
    pub fn start_session(
        &mut self,
        id: SessionId,
        user_query: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> FoldOutcome {
        if self.sessions.contains_key(&id) {
            return FoldOutcome::Unchanged;
        }
        let mut session = Session::new(id.clone(), now, self.defaults.is_expanded);
        session.user_query = user_query;
        session.revision = 1;
        debug!(session = %id, "session started");
        self.sessions.insert(id, session);
        self.revision += 1;
        FoldOutcome::Created
    }

    /// Set the `is_expanded` flag of one session.
    ///
    /// Returns `false` if the session does not exist.
    pub fn set_expanded(&mut self, id: &SessionId, expanded: bool) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        if session.is_expanded != expanded {
            session.is_expanded = expanded;
            session.revision += 1;
            self.revision += 1;
        }
        true
    }

    /// Collapse every session.
    pub fn collapse_all(&mut self) {
        self.collapse_where(|_| true);
    }

    /// Collapse every session except `keep`, typically the one just started.
    pub fn collapse_all_except(&mut self, keep: &SessionId) {
        self.collapse_where(|id| id != keep);
    }

    /// Look up a session by id.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Iterate sessions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Table-wide revision clock.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Sessions ordered newest first (by creation time, then id).
    #[must_use]
    pub fn sessions_newest_first(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        sessions
    }

    /// Consume the table, yielding sessions in id order.
    #[must_use]
    pub fn into_sessions(self) -> Vec<Session> {
        self.sessions.into_values().collect()
    }

    fn apply_to(
        &mut self,
        ctx: &FoldContext,
        mutate: impl FnOnce(&mut Session) -> bool,
    ) -> FoldOutcome {
        let created = !self.sessions.contains_key(&ctx.session_id);
        let is_expanded = self.defaults.is_expanded;
        let session = self
            .sessions
            .entry(ctx.session_id.clone())
            .or_insert_with(|| Session::new(ctx.session_id.clone(), ctx.now, is_expanded));

        let changed = mutate(session);
        if !created && !changed {
            return FoldOutcome::Unchanged;
        }

        session.revision += 1;
        self.revision += 1;
        if created {
            debug!(session = %ctx.session_id, "session created");
            FoldOutcome::Created
        } else {
            FoldOutcome::Changed
        }
    }

    fn collapse_where(&mut self, mut predicate: impl FnMut(&SessionId) -> bool) {
        let mut collapsed = false;
        for (id, session) in &mut self.sessions {
            if session.is_expanded && predicate(id) {
                session.is_expanded = false;
                session.revision += 1;
                collapsed = true;
            }
        }
        if collapsed {
            self.revision += 1;
        }
    }
}

fn append_activity(session: &mut Session, activity: AgentActivity, ctx: &FoldContext) {
    let id = session.next_agent_entry_id();
    trace!(session = %session.id, entry = %id, agent = activity.agent(), "agent activity");
    session.agent_events.push(AgentLogEntry {
        id,
        timestamp: ctx.now,
        activity,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        AgentPlanData, AgentStartData, ErrorData, EventType, LlmTokenData, ThreadIdData,
        ToolUsedData, UserRequestData, WorkflowCompleteData,
    };
    use crate::model::ToolStatus;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    fn ctx(session: &str, secs: i64) -> FoldContext {
        FoldContext::new(session, at(secs))
    }

    fn request(text: &str) -> Event {
        Event::UserRequest(UserRequestData {
            content: text.to_string(),
        })
    }

    fn tool(id: &str, status: ToolStatus) -> Event {
        Event::ToolUsed(ToolUsedData {
            tool_run_id: id.to_string(),
            tool_name: "code_search".to_string(),
            icon: String::new(),
            description: String::new(),
            status,
            details: BTreeMap::new(),
        })
    }

    fn agent_start(agent: &str) -> Event {
        Event::AgentStart(AgentStartData {
            agent: agent.to_string(),
            message: None,
        })
    }

    #[test]
    fn routing_scenario() {
        let mut table = SessionTable::new();
        let outcomes: Vec<FoldOutcome> = [
            request("Q1"),
            tool("run1", ToolStatus::Running),
            tool("run1", ToolStatus::Completed),
            request("Q2-ignored"),
        ]
        .iter()
        .enumerate()
        .map(|(i, e)| table.apply(e, &ctx("s1", i64::try_from(i).expect("small"))))
        .collect();

        assert_eq!(
            outcomes,
            [
                FoldOutcome::Created,
                FoldOutcome::Changed,
                FoldOutcome::Changed,
                FoldOutcome::Unchanged
            ]
        );
        let session = table.get(&SessionId::from("s1")).expect("session exists");
        assert_eq!(session.user_query.as_deref(), Some("Q1"));
        assert_eq!(session.tool_runs.len(), 1);
        let run = &session.tool_runs["run1"];
        assert_eq!(run.status, ToolStatus::Completed);
        assert_eq!(run.completed_at, Some(at(2)));
        assert_eq!(session.timestamp, at(0));
    }

    #[test]
    fn query_set_later_if_session_opened_by_tool() {
        let mut table = SessionTable::new();
        table.apply(&tool("r1", ToolStatus::Running), &ctx("s1", 0));
        table.apply(&request("late"), &ctx("s1", 1));
        let session = table.get(&SessionId::from("s1")).expect("session");
        assert_eq!(session.user_query.as_deref(), Some("late"));
    }

    #[test]
    fn agent_events_are_appended_never_merged() {
        let mut table = SessionTable::new();
        table.apply(&agent_start("planner"), &ctx("s1", 0));
        table.apply(&agent_start("planner"), &ctx("s1", 1));
        table.apply(
            &Event::AgentPlan(AgentPlanData {
                agent: "planner".to_string(),
                message: Some("Plan".to_string()),
                steps: vec!["read".to_string(), "edit".to_string()],
            }),
            &ctx("s1", 2),
        );

        let session = table.get(&SessionId::from("s1")).expect("session");
        let ids: Vec<&str> = session.agent_events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["s1:agent:0", "s1:agent:1", "s1:agent:2"]);
        assert_eq!(session.agent_events[2].timestamp, at(2));
        assert!(matches!(
            session.agent_events[2].activity,
            AgentActivity::AgentPlan(_)
        ));
        assert!(session.tool_runs.is_empty());
    }

    #[test]
    fn observe_only_events_signal_and_do_not_create() {
        let mut table = SessionTable::new();
        let thread = table.apply(
            &Event::ThreadId(ThreadIdData {
                thread_id: "th-9".to_string(),
            }),
            &ctx("s1", 0),
        );
        let token = table.apply(
            &Event::LlmToken(LlmTokenData {
                token: "hi".to_string(),
            }),
            &ctx("s1", 0),
        );
        let done = table.apply(
            &Event::WorkflowComplete(WorkflowCompleteData { message: None }),
            &ctx("s1", 0),
        );
        let failed = table.apply(
            &Event::Error(ErrorData {
                message: "boom".to_string(),
            }),
            &ctx("s1", 0),
        );

        assert_eq!(thread, FoldOutcome::Signal(Signal::ThreadId("th-9".to_string())));
        assert_eq!(token, FoldOutcome::Signal(Signal::Progress(EventType::LlmToken)));
        assert_eq!(done, FoldOutcome::Signal(Signal::WorkflowComplete(None)));
        assert_eq!(failed, FoldOutcome::Signal(Signal::Error("boom".to_string())));
        assert!(table.is_empty());
        assert_eq!(table.revision(), 0);
    }

    #[test]
    fn revisions_move_only_on_change() {
        let mut table = SessionTable::new();
        table.apply(&tool("r1", ToolStatus::Completed), &ctx("s1", 0));
        assert_eq!(table.revision(), 1);
        table.apply(&tool("r1", ToolStatus::Completed), &ctx("s1", 1));
        assert_eq!(table.revision(), 1);
        table.apply(&request("Q"), &ctx("s1", 2));
        assert_eq!(table.revision(), 2);
        assert_eq!(table.get(&SessionId::from("s1")).expect("session").revision, 2);
    }

    #[test]
    fn sessions_are_independent() {
        let mut table = SessionTable::new();
        table.apply(&request("A"), &ctx("a", 0));
        table.apply(&request("B"), &ctx("b", 1));
        table.apply(&tool("r1", ToolStatus::Running), &ctx("a", 2));
        assert_eq!(table.len(), 2);
        assert!(table.get(&SessionId::from("b")).expect("b").tool_runs.is_empty());
        let newest: Vec<&str> = table
            .sessions_newest_first()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(newest, ["b", "a"]);
    }

    #[test]
    fn start_session_and_collapse_policy() {
        let mut table = SessionTable::new();
        assert_eq!(
            table.start_session(SessionId::from("s1"), Some("first".to_string()), at(0)),
            FoldOutcome::Created
        );
        assert_eq!(
            table.start_session(SessionId::from("s2"), Some("second".to_string()), at(1)),
            FoldOutcome::Created
        );
        assert_eq!(
            table.start_session(SessionId::from("s2"), None, at(2)),
            FoldOutcome::Unchanged
        );
        table.collapse_all_except(&SessionId::from("s2"));

        assert!(!table.get(&SessionId::from("s1")).expect("s1").is_expanded);
        let s2 = table.get(&SessionId::from("s2")).expect("s2");
        assert!(s2.is_expanded);
        assert_eq!(s2.user_query.as_deref(), Some("second"));

        let before = table.revision();
        table.collapse_all();
        assert!(table.iter().all(|s| !s.is_expanded));
        assert_eq!(table.revision(), before + 1);
        table.collapse_all();
        assert_eq!(table.revision(), before + 1);

        assert!(table.set_expanded(&SessionId::from("s1"), true));
        assert!(!table.set_expanded(&SessionId::from("missing"), true));
    }

    #[test]
    fn defaults_control_new_sessions() {
        let mut table = SessionTable::with_defaults(SessionDefaults { is_expanded: false });
        table.apply(&request("Q"), &ctx("s1", 0));
        assert!(!table.get(&SessionId::from("s1")).expect("s1").is_expanded);
        assert_eq!(table.into_sessions().len(), 1);
    }
}
