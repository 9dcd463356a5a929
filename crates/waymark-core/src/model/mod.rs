pub mod scalar;
pub mod session;
pub mod tool_run;
pub mod work_item;

pub use scalar::Scalar;
pub use session::{AgentActivity, AgentLogEntry, Session, SessionId};
pub use tool_run::{ToolRunState, ToolRunTable, ToolStatus};
pub use work_item::{Diagram, TestCase, WorkItem, WorkItemError, WorkItemType};

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Deserialize a field, reading an explicit JSON `null` as the default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}
