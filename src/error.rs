//! Error types shared by the ledger, its collaborators and the HTTP layer

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },
    #[error("ledger unavailable for bucket {bucket}: {reason}")]
    LedgerUnavailable { bucket: String, reason: String },
    #[error("snapshot store error: {0}")]
    SnapshotStore(String),
    #[error("log sink error: {0}")]
    LogSink(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("blocking task failed: {0}")]
    Blocking(String),
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            LedgerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LedgerError::LedgerUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Callers only ever see a static message; details stay in the logs.
    fn error_response(&self) -> HttpResponse {
        let body = match self.status_code() {
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::BAD_REQUEST => "Malformed request",
            StatusCode::GATEWAY_TIMEOUT => "Upstream call timed out",
            StatusCode::SERVICE_UNAVAILABLE => "Ledger unavailable",
            _ => "Internal error",
        };
        HttpResponse::build(self.status_code()).body(body)
    }
}
