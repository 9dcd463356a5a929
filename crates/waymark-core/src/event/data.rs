//! Typed payload structs, one per event type.
//!
//! Unknown payload fields are ignored so newer producers can add fields
//! without breaking this reader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::null_as_default;
use crate::model::scalar::Scalar;
use crate::model::tool_run::ToolStatus;

/// Payload for `thread_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadIdData {
    pub thread_id: String,
}

/// Payload for `user_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequestData {
    /// The question as typed by the user.
    #[serde(alias = "text", alias = "query")]
    pub content: String,
}

/// Payload for `agent_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStartData {
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload for `agent_plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPlanData {
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Plan steps in the order the agent intends to run them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

/// Payload for `tool_used`.
///
/// The same `tool_run_id` is reported several times over a run's life;
/// the fold merges them into one [`ToolRunState`](crate::model::ToolRunState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsedData {
    pub tool_run_id: String,
    pub tool_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub status: ToolStatus,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub details: BTreeMap<String, Scalar>,
}

/// Payload for `node_start` and `node_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub node: String,
}

/// Payload for `llm_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmStartData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Payload for `llm_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmTokenData {
    pub token: String,
}

/// Payload for `llm_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmEndData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Payload for `impact_plan_ready`. The plan body is opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImpactPlanData {
    #[serde(default)]
    pub plan: serde_json::Value,
}

/// Payload for `workflow_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkflowCompleteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload for `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}
