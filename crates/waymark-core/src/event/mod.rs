//! Progress-event data model.
//!
//! This module defines the [`Event`] sum type covering the whole catalog, the
//! [`EventType`] discriminant enum, one typed payload struct per variant, and
//! the lenient decoding entry points used by live folding and history replay.
//!
//! # Wire format
//!
//! Every event is a JSON object with a string `type` discriminant and the
//! fields of its variant at the top level:
//!
//! ```text
//! {"type": "tool_used", "tool_run_id": "r1", "tool_name": "grep", "status": "running"}
//! ```
//!
//! [`Event`] serializes back to the same shape.

pub mod data;
pub mod decode;
pub mod types;

pub use data::{
    AgentPlanData, AgentStartData, ErrorData, ImpactPlanData, LlmEndData, LlmStartData,
    LlmTokenData, NodeData, ThreadIdData, ToolUsedData, UserRequestData, WorkflowCompleteData,
};
pub use decode::{DecodeError, Decoded, decode_event, decode_str, deserialize_lenient};
pub use types::{EventType, UnknownEventType};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single progress event. Immutable once observed.
///
/// **Serde note:** serialization is derived (internally tagged on `type`).
/// Deserialization is hand-written so the payload is decoded by the known
/// [`EventType`]; an unknown `type` is a deserialization error here, and
/// [`decode_event`] is the forward-compatible entry point that turns it into
/// [`Decoded::Unknown`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ThreadId(ThreadIdData),
    UserRequest(UserRequestData),
    AgentStart(AgentStartData),
    AgentPlan(AgentPlanData),
    ToolUsed(ToolUsedData),
    NodeStart(NodeData),
    NodeEnd(NodeData),
    LlmStart(LlmStartData),
    LlmToken(LlmTokenData),
    LlmEnd(LlmEndData),
    ImpactPlanReady(ImpactPlanData),
    WorkflowComplete(WorkflowCompleteData),
    Error(ErrorData),
}

impl Event {
    /// The discriminant of this event.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::ThreadId(_) => EventType::ThreadId,
            Self::UserRequest(_) => EventType::UserRequest,
            Self::AgentStart(_) => EventType::AgentStart,
            Self::AgentPlan(_) => EventType::AgentPlan,
            Self::ToolUsed(_) => EventType::ToolUsed,
            Self::NodeStart(_) => EventType::NodeStart,
            Self::NodeEnd(_) => EventType::NodeEnd,
            Self::LlmStart(_) => EventType::LlmStart,
            Self::LlmToken(_) => EventType::LlmToken,
            Self::LlmEnd(_) => EventType::LlmEnd,
            Self::ImpactPlanReady(_) => EventType::ImpactPlanReady,
            Self::WorkflowComplete(_) => EventType::WorkflowComplete,
            Self::Error(_) => EventType::Error,
        }
    }

    /// Decode a JSON object into the variant named by `event_type`.
    ///
    /// The `type` key itself, and any other unknown key, is ignored by the
    /// payload structs.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the payload does not
    /// match the schema for `event_type`.
    pub fn deserialize_for(event_type: EventType, value: Value) -> Result<Self, serde_json::Error> {
        match event_type {
            EventType::ThreadId => serde_json::from_value(value).map(Self::ThreadId),
            EventType::UserRequest => serde_json::from_value(value).map(Self::UserRequest),
            EventType::AgentStart => serde_json::from_value(value).map(Self::AgentStart),
            EventType::AgentPlan => serde_json::from_value(value).map(Self::AgentPlan),
            EventType::ToolUsed => serde_json::from_value(value).map(Self::ToolUsed),
            EventType::NodeStart => serde_json::from_value(value).map(Self::NodeStart),
            EventType::NodeEnd => serde_json::from_value(value).map(Self::NodeEnd),
            EventType::LlmStart => serde_json::from_value(value).map(Self::LlmStart),
            EventType::LlmToken => serde_json::from_value(value).map(Self::LlmToken),
            EventType::LlmEnd => serde_json::from_value(value).map(Self::LlmEnd),
            EventType::ImpactPlanReady => serde_json::from_value(value).map(Self::ImpactPlanReady),
            EventType::WorkflowComplete => {
                serde_json::from_value(value).map(Self::WorkflowComplete)
            }
            EventType::Error => serde_json::from_value(value).map(Self::Error),
        }
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let raw_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| serde::de::Error::missing_field("type"))?;
        let event_type: EventType = raw_type.parse().map_err(serde::de::Error::custom)?;
        Self::deserialize_for(event_type, value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThreadId(d) => write!(f, "thread_id: {}", d.thread_id),
            Self::UserRequest(d) => write!(f, "user_request: {}", d.content),
            Self::AgentStart(d) => write!(f, "agent_start: {}", d.agent),
            Self::AgentPlan(d) => write!(f, "agent_plan: {} ({} steps)", d.agent, d.steps.len()),
            Self::ToolUsed(d) => write!(f, "tool_used: {} {} {}", d.tool_run_id, d.tool_name, d.status),
            Self::NodeStart(d) => write!(f, "node_start: {}", d.node),
            Self::NodeEnd(d) => write!(f, "node_end: {}", d.node),
            Self::LlmStart(_) => f.write_str("llm_start"),
            Self::LlmToken(_) => f.write_str("llm_token"),
            Self::LlmEnd(_) => f.write_str("llm_end"),
            Self::ImpactPlanReady(_) => f.write_str("impact_plan_ready"),
            Self::WorkflowComplete(_) => f.write_str("workflow_complete"),
            Self::Error(d) => write!(f, "error: {}", d.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolStatus;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample_tool_used() -> Event {
        let mut details = BTreeMap::new();
        details.insert("query".to_string(), "fn main".into());
        Event::ToolUsed(ToolUsedData {
            tool_run_id: "run-1".into(),
            tool_name: "code_search".into(),
            icon: "search".into(),
            description: "Searching the repository".into(),
            status: ToolStatus::Running,
            details,
        })
    }

    #[test]
    fn serializes_with_type_tag() {
        let value = serde_json::to_value(sample_tool_used()).expect("serialize");
        assert_eq!(value["type"], "tool_used");
        assert_eq!(value["tool_run_id"], "run-1");
        assert_eq!(value["status"], "running");
        assert_eq!(value["details"]["query"], "fn main");
    }

    #[test]
    fn json_roundtrip_keeps_variant() {
        let event = sample_tool_used();
        let json = serde_json::to_string(&event).expect("serialize");
        let back: Event = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn tag_matches_event_type() {
        let events = vec![
            Event::ThreadId(ThreadIdData {
                thread_id: "t".into(),
            }),
            Event::UserRequest(UserRequestData {
                content: "q".into(),
            }),
            Event::NodeEnd(NodeData { node: "n".into() }),
            Event::LlmEnd(LlmEndData::default()),
            Event::ImpactPlanReady(ImpactPlanData {
                plan: json!({"steps": []}),
            }),
            Event::Error(ErrorData {
                message: "x".into(),
            }),
        ];
        for event in events {
            let value = serde_json::to_value(&event).expect("serialize");
            assert_eq!(value["type"], event.event_type().as_str());
        }
    }

    #[test]
    fn deserialize_rejects_unknown_type() {
        let err = serde_json::from_value::<Event>(json!({"type": "tool_retried"})).unwrap_err();
        assert!(err.to_string().contains("tool_retried"));
    }

    #[test]
    fn deserialize_rejects_missing_type() {
        assert!(serde_json::from_value::<Event>(json!({"thread_id": "t"})).is_err());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(
            sample_tool_used().to_string(),
            "tool_used: run-1 code_search running"
        );
    }
}
