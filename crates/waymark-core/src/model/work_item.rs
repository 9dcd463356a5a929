use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use super::{ParseEnumError, null_as_default};
use super::scalar::Scalar;
use crate::error::ErrorCode;

/// The three kinds of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemType {
    Feature,
    Story,
    #[default]
    Task,
}

impl WorkItemType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Story => "story",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feature" => Ok(Self::Feature),
            "story" => Ok(Self::Story),
            "task" => Ok(Self::Task),
            _ => Err(ParseEnumError {
                expected: "work item type",
                got: s.to_string(),
            }),
        }
    }
}

/// A diagram attached to a work item. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Diagram {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
}

/// A test case attached to a work item. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestCase {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub expected_result: String,
}

/// A snapshot of a work item as handed to the diff engine.
///
/// Every field defaults when missing so partial snapshots still compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkItem {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project_id: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub item_type: WorkItemType,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub parent_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub validation_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, Scalar>,
    #[serde(deserialize_with = "null_as_default")]
    pub acceptance_criteria: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub diagrams: Vec<Diagram>,
    #[serde(deserialize_with = "null_as_default")]
    pub test_cases: Vec<TestCase>,
}

/// Error returned when a work item snapshot cannot be decoded.
#[derive(Debug, thiserror::Error)]
#[error("malformed work item snapshot: {0}")]
pub struct WorkItemError(#[from] serde_json::Error);

impl WorkItemError {
    /// Stable machine code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::MalformedWorkItem
    }
}

impl WorkItem {
    /// Decode a snapshot from JSON text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WorkItemError`] if the text is not a JSON object or a field
    /// has the wrong type.
    pub fn from_json(raw: &str) -> Result<Self, WorkItemError> {
        Ok(serde_json::from_str(raw)?)
    }
}
