use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputUnreadable,
    MalformedEvent,
    UnknownEventType,
    MalformedHistory,
    MalformedWorkItem,
    InternalUnexpected,
}

impl ErrorCode {
    /// All codes in catalog order.
    pub const ALL: [Self; 7] = [
        Self::ConfigParseError,
        Self::InputUnreadable,
        Self::MalformedEvent,
        Self::UnknownEventType,
        Self::MalformedHistory,
        Self::MalformedWorkItem,
        Self::InternalUnexpected,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputUnreadable => "E1002",
            Self::MalformedEvent => "E2001",
            Self::UnknownEventType => "E2002",
            Self::MalformedHistory => "E2003",
            Self::MalformedWorkItem => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputUnreadable => "Input file could not be read",
            Self::MalformedEvent => "Malformed progress event",
            Self::UnknownEventType => "Unknown event type",
            Self::MalformedHistory => "Malformed history record",
            Self::MalformedWorkItem => "Malformed work item snapshot",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .waymark/config.toml and retry."),
            Self::InputUnreadable => Some("Check the path and read permissions."),
            Self::MalformedEvent => {
                Some("Every event needs a string `type` and the fields of its variant.")
            }
            Self::UnknownEventType => None,
            Self::MalformedHistory => {
                Some("History must be a JSON array of {timestamp, events} records.")
            }
            Self::MalformedWorkItem => Some("Pass a JSON object with work item fields."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
