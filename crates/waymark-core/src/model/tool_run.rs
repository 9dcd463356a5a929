use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use super::scalar::Scalar;
use super::ParseEnumError;

/// Lifecycle status of a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

impl ToolStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Returns `true` once the run has stopped (successfully or not).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(ParseEnumError {
                expected: "tool status",
                got: s.to_string(),
            }),
        }
    }
}

/// Folded state of one tool invocation, keyed by `tool_run_id` in a session.
///
/// `completed_at` only ever moves from unset to set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRunState {
    pub tool_run_id: String,
    pub tool_name: String,
    pub icon: String,
    pub description: String,
    pub status: ToolStatus,
    pub details: BTreeMap<String, Scalar>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ToolRunState {
    /// Wall-clock time between start and completion, if completed.
    #[must_use]
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Tool runs of one session, keyed by `tool_run_id`.
///
/// Ordering of the map carries no meaning; display order is derived from
/// `started_at`.
pub type ToolRunTable = BTreeMap<String, ToolRunState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_json_roundtrip() {
        assert_eq!(
            serde_json::to_string(&ToolStatus::Completed).expect("serialize"),
            "\"completed\""
        );
        assert_eq!(
            serde_json::from_str::<ToolStatus>("\"running\"").expect("deserialize"),
            ToolStatus::Running
        );
        assert!(serde_json::from_str::<ToolStatus>("\"paused\"").is_err());
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        for status in [ToolStatus::Running, ToolStatus::Completed, ToolStatus::Error] {
            let upper = status.to_string().to_uppercase();
            assert_eq!(ToolStatus::from_str(&upper).expect("parse"), status);
        }
        assert!(ToolStatus::from_str("queued").is_err());
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!ToolStatus::Running.is_terminal());
        assert!(ToolStatus::Completed.is_terminal());
        assert!(ToolStatus::Error.is_terminal());
    }
}
