//! Structured Log Sink Abstraction
//!
//! An append-only store of JSON log lines that can be queried by time range
//! and filtered on the `object_name` field of the payload. Queries are
//! paginated; callers follow `next_token` until it is `None`.
//!
//! Lines may carry a tab separated prefix (timestamp, request id, level) in
//! front of the JSON payload. The payload is always the text after the last tab.

pub mod sqlite_store;
pub mod mock_store;
pub mod config;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A line to append to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Raw log line
    pub message: String,
    /// Identifier of the storage event that produced the line, if any
    pub event_id: Option<String>,
}

/// A stored line as returned by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: u64,
    pub timestamp_ms: i64,
    pub message: String,
}

/// Time-bounded query with an optional payload filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Inclusive lower bound in epoch milliseconds
    pub start_ms: i64,
    /// Inclusive upper bound in epoch milliseconds
    pub end_ms: i64,
    /// Only match lines whose payload has `object_name` equal to this value
    pub object_name: Option<String>,
}

impl LogQuery {
    pub fn for_object(object_name: &str, start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms,
            end_ms,
            object_name: Some(object_name.to_string()),
        }
    }

    /// Whether an event falls inside this query
    pub fn matches(&self, timestamp_ms: i64, message: &str) -> bool {
        if timestamp_ms < self.start_ms || timestamp_ms > self.end_ms {
            return false;
        }
        match &self.object_name {
            Some(wanted) => object_name_of(message).as_deref() == Some(wanted.as_str()),
            None => true,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub events: Vec<LogEvent>,
    pub next_token: Option<String>,
}

/// Trait defining the structured log sink interface
pub trait LogSink: Send + Sync {
    /// Append one line
    fn append(&self, entry: LogEntry) -> Result<()>;

    /// Fetch one page of lines matching the query, resuming after `next_token`
    fn query(&self, query: &LogQuery, next_token: Option<&str>) -> Result<LogPage>;

    /// Whether a line tagged with this event id has already been appended
    fn contains_event_id(&self, event_id: &str) -> Result<bool>;
}

/// The JSON payload of a log line: the text after the last tab, trimmed
pub fn payload_of(message: &str) -> &str {
    message.rsplit('\t').next().unwrap_or(message).trim()
}

/// The `object_name` field of a line's payload, if the payload is a JSON object carrying one
pub fn object_name_of(message: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload_of(message)).ok()?;
    value.get("object_name")?.as_str().map(str::to_string)
}
