//! Rebuild sessions from persisted history.
//!
//! History is a list of `{timestamp, events}` records, one per past session,
//! events in their original order. Replay pushes each record through the
//! same [`SessionTable`] fold used for live streams, so historical and live
//! sessions have the same shape.
//!
//! # Single-timestamp coarsening
//!
//! Only one timestamp is persisted per record, and it is used as `now` for
//! every event in it. All tool runs of a replayed session therefore share
//! `started_at`, and a run that finished inside the record has
//! `completed_at == started_at`. Live folding can show real elapsed time;
//! replay cannot.
//!
//! # Session ids
//!
//! Replayed session ids are `"{prefix}-{unix_millis}-{ordinal}"`, a pure
//! function of the record timestamp and its position in the batch, so
//! replaying the same history twice yields the same ids.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ErrorCode;
use crate::event::{Event, deserialize_lenient};
use crate::fold::{FoldContext, SessionDefaults, SessionTable};
use crate::model::session::{Session, SessionId};

/// Default prefix for replayed session ids.
pub const DEFAULT_ID_PREFIX: &str = "history";

/// One persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The single timestamp persisted for the record. Any ISO-8601 form
    /// accepted by [`parse_timestamp`].
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Events in original order. Malformed and unknown events are dropped
    /// on decode.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub events: Vec<Event>,
}

/// Replay knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Prefix of synthesized session ids.
    pub id_prefix: String,
    /// Initial `is_expanded` flag of replayed sessions.
    pub is_expanded: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            is_expanded: false,
        }
    }
}

/// Errors from decoding raw history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The document is not a JSON array.
    #[error("history is not a JSON array of records: {0}")]
    Document(#[source] serde_json::Error),

    /// One record is malformed (for example a missing or non ISO-8601
    /// `timestamp`).
    #[error("history record {index} is malformed: {source}")]
    Entry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl HistoryError {
    /// Stable machine code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::MalformedHistory
    }
}

/// Parse an ISO-8601 timestamp.
///
/// An explicit offset is honored. A timestamp without one is read as UTC,
/// and a bare date is midnight UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
}

/// Deterministic id of the replayed session at `ordinal` in a batch.
#[must_use]
pub fn history_session_id(prefix: &str, timestamp: DateTime<Utc>, ordinal: usize) -> SessionId {
    SessionId::new(format!(
        "{prefix}-{}-{ordinal}",
        timestamp.timestamp_millis()
    ))
}

/// Replay history with default options (collapsed sessions, `history`
/// id prefix).
#[must_use]
pub fn replay(entries: &[HistoryEntry]) -> Vec<Session> {
    replay_with(entries, &ReplayOptions::default())
}

/// Replay history into one session per record, in record order.
#[must_use]
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn replay_with(entries: &[HistoryEntry], options: &ReplayOptions) -> Vec<Session> {
    let defaults = SessionDefaults {
        is_expanded: options.is_expanded,
    };
    let mut sessions = Vec::with_capacity(entries.len());

    for (ordinal, entry) in entries.iter().enumerate() {
        let id = history_session_id(&options.id_prefix, entry.timestamp, ordinal);
        let ctx = FoldContext::new(id.clone(), entry.timestamp);

        let mut table = SessionTable::with_defaults(defaults);
        table.start_session(id, None, entry.timestamp);
        for event in &entry.events {
            table.apply(event, &ctx);
        }

        debug!(
            session = %ctx.session_id,
            events = entry.events.len(),
            "replayed history record"
        );
        sessions.extend(table.into_sessions());
    }

    sessions
}

/// Decode raw history JSON and replay it.
///
/// Events inside a record are decoded leniently; the record itself must be
/// well formed.
///
/// # Errors
///
/// Returns [`HistoryError`] if the document is not an array or a record
/// lacks a valid `timestamp`.
pub fn replay_json(raw: &str, options: &ReplayOptions) -> Result<Vec<Session>, HistoryError> {
    let entries = parse_history(raw)?;
    Ok(replay_with(&entries, options))
}

/// Decode raw history JSON into records without replaying it.
///
/// # Errors
///
/// Same as [`replay_json`].
pub fn parse_history(raw: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
    let values: Vec<Value> = serde_json::from_str(raw).map_err(HistoryError::Document)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|source| HistoryError::Entry { index, source })
        })
        .collect()
}
