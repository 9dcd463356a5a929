//! Forward-compatible decoding of raw events.
//!
//! Producers may emit event types this build does not know yet. Those are
//! surfaced as [`Decoded::Unknown`] rather than errors so callers can treat
//! them as no-ops. Events of a known type with missing or mistyped fields
//! are [`DecodeError`]s; lenient callers drop them without touching state.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::Event;
use super::types::EventType;
use crate::error::ErrorCode;

/// Outcome of decoding one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A known, well-formed event.
    Event(Event),
    /// A well-formed object whose `type` this build does not understand.
    Unknown(String),
}

/// Errors from decoding a single raw event.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input is not JSON at all.
    #[error("event is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is JSON but not an object.
    #[error("event must be a JSON object")]
    NotAnObject,

    /// The object has no string `type` discriminant.
    #[error("event is missing a string `type` discriminant")]
    MissingType,

    /// The payload does not match the schema of its type.
    #[error("invalid {event_type} payload: {source}")]
    Payload {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Stable machine code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::MalformedEvent
    }

    /// The event type involved, when the discriminant was readable.
    #[must_use]
    pub const fn event_type(&self) -> Option<EventType> {
        match self {
            Self::Payload { event_type, .. } => Some(*event_type),
            _ => None,
        }
    }
}

/// Decode a JSON value into an [`Event`], tolerating unknown types.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the value is not an object, lacks a string
/// `type`, or carries a payload that does not match its known type.
pub fn decode_event(value: Value) -> Result<Decoded, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let raw_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    let Ok(event_type) = raw_type.parse::<EventType>() else {
        return Ok(Decoded::Unknown(raw_type.to_string()));
    };

    Event::deserialize_for(event_type, value)
        .map(Decoded::Event)
        .map_err(|source| DecodeError::Payload { event_type, source })
}

/// Decode one JSON text (e.g. a JSON-lines record) into an [`Event`].
///
/// # Errors
///
/// Same as [`decode_event`], plus [`DecodeError::Json`] for invalid JSON.
pub fn decode_str(raw: &str) -> Result<Decoded, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_event(value)
}

/// Serde helper: decode a list of raw events, dropping malformed and
/// unknown entries instead of failing the whole list.
///
/// Used for persisted history, where one bad event must not hide the rest
/// of a session.
///
/// # Errors
///
/// Fails only if the input is not a JSON array.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<Event>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    let mut events = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match decode_event(value) {
            Ok(Decoded::Event(event)) => events.push(event),
            Ok(Decoded::Unknown(raw_type)) => {
                debug!(index, code = %ErrorCode::UnknownEventType, event_type = %raw_type, "skipping unknown event type");
            }
            Err(e) => {
                warn!(index, code = %e.error_code(), error = %e, "dropping malformed event");
            }
        }
    }
    Ok(events)
}
