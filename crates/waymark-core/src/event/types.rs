//! Event type enum covering the progress-event catalog.
//!
//! The string form is the `type` discriminant carried by every event on the
//! wire (`tool_used`, `agent_plan`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The event types understood by this build.
///
/// Types outside this catalog are tolerated on input and ignored; see
/// [`Decoded::Unknown`](super::Decoded::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Correlation id of the backend conversation thread.
    ThreadId,
    /// The question that opened a session.
    UserRequest,
    /// A sub-agent started working.
    AgentStart,
    /// A sub-agent published its plan.
    AgentPlan,
    /// A tool invocation started, progressed or finished.
    ToolUsed,
    /// A workflow node was entered.
    NodeStart,
    /// A workflow node was left.
    NodeEnd,
    /// A model call started.
    LlmStart,
    /// A streamed model token.
    LlmToken,
    /// A model call finished.
    LlmEnd,
    /// The impact plan is ready for review.
    ImpactPlanReady,
    /// The workflow finished.
    WorkflowComplete,
    /// The workflow reported an error.
    Error,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type '{}'", self.raw)
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All known event types in catalog order.
    pub const ALL: [Self; 13] = [
        Self::ThreadId,
        Self::UserRequest,
        Self::AgentStart,
        Self::AgentPlan,
        Self::ToolUsed,
        Self::NodeStart,
        Self::NodeEnd,
        Self::LlmStart,
        Self::LlmToken,
        Self::LlmEnd,
        Self::ImpactPlanReady,
        Self::WorkflowComplete,
        Self::Error,
    ];

    /// Return the wire discriminant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreadId => "thread_id",
            Self::UserRequest => "user_request",
            Self::AgentStart => "agent_start",
            Self::AgentPlan => "agent_plan",
            Self::ToolUsed => "tool_used",
            Self::NodeStart => "node_start",
            Self::NodeEnd => "node_end",
            Self::LlmStart => "llm_start",
            Self::LlmToken => "llm_token",
            Self::LlmEnd => "llm_end",
            Self::ImpactPlanReady => "impact_plan_ready",
            Self::WorkflowComplete => "workflow_complete",
            Self::Error => "error",
        }
    }

    /// Returns `true` for the types that change a session's shape.
    ///
    /// Everything else is observed by the caller and leaves sessions alone.
    #[must_use]
    pub const fn shapes_session(self) -> bool {
        matches!(
            self,
            Self::UserRequest | Self::AgentStart | Self::AgentPlan | Self::ToolUsed
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType { raw: s.to_string() })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
