//! Structured log records written by the ledger
//!
//! Every processed storage event produces exactly one line in the log sink:
//! a size delta, a warning, or an error. Lines are single JSON objects.

use serde::{Deserialize, Serialize};

/// Size impact of one object mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDeltaRecord {
    pub object_name: String,
    /// Positive for creations, negated recovered size for removals
    pub size_delta: i64,
}

impl SizeDeltaRecord {
    pub fn created(object_name: &str, size: u64) -> Self {
        Self {
            object_name: object_name.to_string(),
            size_delta: i64::try_from(size).unwrap_or(i64::MAX),
        }
    }

    pub fn removed(object_name: &str, size: u64) -> Self {
        Self {
            object_name: object_name.to_string(),
            size_delta: -i64::try_from(size).unwrap_or(i64::MAX),
        }
    }

    /// Magnitude of the delta in bytes
    pub fn magnitude(&self) -> u64 {
        self.size_delta.unsigned_abs()
    }
}

/// One line of the structured log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Delta(SizeDeltaRecord),
    Warning { warning: String },
    Error { error: String, details: String },
}

impl LogRecord {
    pub fn warning(message: impl Into<String>) -> Self {
        LogRecord::Warning {
            warning: message.into(),
        }
    }

    pub fn error(error: impl Into<String>, details: impl Into<String>) -> Self {
        LogRecord::Error {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
