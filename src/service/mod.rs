//service/mod.rs
pub mod ledger_service;
pub mod recovery_service;
pub mod cleaner_service;
pub mod history_service;

use std::time::Duration;

use actix_web::{web, HttpResponse, Error};
use actix_web::error::ErrorInternalServerError;
use futures::StreamExt;
use bytes::BytesMut;
use log::{info, error, warn, debug};
use log_mdc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{LedgerError, Result};
use crate::events::{normalize, StorageEvent};
use crate::service::ledger_service::BatchReport;

const SIZE_TRACKED: &str = "Size tracked successfully!";
const SIZE_TRACKING_FAILED: &str = "Size tracking failed";
const LOGGING_SUCCESSFUL: &str = "Logging successful!";
const LOGGING_FAILED: &str = "Logging failed";
const CLEANER_FAILED: &str = "Cleaner failed";
const NO_OBJECTS: &str = "No objects to delete.";
const NO_DATA: &str = "No data available.";

/// Drain a request body into memory
async fn read_body(mut payload: web::Payload) -> std::result::Result<BytesMut, Error> {
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ErrorInternalServerError)?;
        bytes.extend_from_slice(&chunk);
    }
    debug!("Total received body size: {} bytes", bytes.len());
    Ok(bytes)
}

/// Run one blocking unit of work on the blocking pool, bounded by `limit`.
/// A unit that times out keeps running in the background; its result is dropped.
async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, web::block(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(LedgerError::Blocking(e.to_string())),
        Err(_) => Err(LedgerError::Timeout(limit)),
    }
}

fn tag_event(event: &StorageEvent) {
    log_mdc::insert("bucket", &event.bucket);
    log_mdc::insert("object_key", &event.object_key);
}

fn untag_event() {
    log_mdc::remove("bucket");
    log_mdc::remove("object_key");
}

/// Size tracking: recompute and snapshot the bucket of every delivered event
pub async fn size_events_handler(payload: web::Payload, app_state: web::Data<AppState>) -> std::result::Result<HttpResponse, Error> {
    let body = read_body(payload).await?;
    let events = match normalize(&body) {
        Ok(events) => events,
        Err(e) => {
            error!("Size tracking failed: {}", e);
            return Ok(HttpResponse::InternalServerError().body(SIZE_TRACKING_FAILED));
        }
    };

    let limit = app_state.config.ledger.call_timeout();
    for event in events {
        let ledger = app_state.ledger.clone();
        let result = run_blocking(limit, move || {
            tag_event(&event);
            let snapshot = ledger.record_snapshot(&event.bucket);
            untag_event();
            snapshot
        })
        .await;

        if let Err(e) = result {
            error!("Size tracking failed: {}", e);
            return Ok(HttpResponse::InternalServerError().body(SIZE_TRACKING_FAILED));
        }
    }

    Ok(HttpResponse::Ok().body(SIZE_TRACKED))
}

/// Size-delta logging: one log line per delivered event, failures isolated per event
pub async fn log_events_handler(payload: web::Payload, app_state: web::Data<AppState>) -> std::result::Result<HttpResponse, Error> {
    let body = read_body(payload).await?;
    let limit = app_state.config.ledger.call_timeout();

    let events = match normalize(&body) {
        Ok(events) => events,
        Err(e) => {
            let ledger = app_state.ledger.clone();
            let details = e.to_string();
            if let Err(e) = run_blocking(limit, move || {
                ledger.log_failure(&details);
                Ok(())
            })
            .await
            {
                error!("Could not record failure: {}", e);
            }
            return Ok(HttpResponse::InternalServerError().body(LOGGING_FAILED));
        }
    };

    let mut report = BatchReport::default();
    for event in events {
        let ledger = app_state.ledger.clone();
        let key = event.object_key.clone();
        let outcome = run_blocking(limit, move || {
            tag_event(&event);
            let outcome = ledger.handle_event(&event);
            untag_event();
            outcome
        })
        .await;

        if let Err(LedgerError::Timeout(_)) = &outcome {
            warn!("Logging for {} timed out after {:?}", key, limit);
        }
        report.record(&outcome);
    }

    info!(
        "Processed batch: appended={} warnings={} skipped={} failed={}",
        report.appended, report.warnings, report.skipped, report.failed
    );
    if report.is_success() {
        Ok(HttpResponse::Ok().body(LOGGING_SUCCESSFUL))
    } else {
        Ok(HttpResponse::InternalServerError().body(LOGGING_FAILED))
    }
}

/// Manual or scheduled full recompute of one bucket
pub async fn snapshot_handler(path: web::Path<String>, app_state: web::Data<AppState>) -> std::result::Result<HttpResponse, Error> {
    let bucket = path.into_inner();
    let ledger = app_state.ledger.clone();
    let snapshot = run_blocking(app_state.config.ledger.call_timeout(), move || {
        log_mdc::insert("bucket", &bucket);
        let snapshot = ledger.record_snapshot(&bucket);
        log_mdc::remove("bucket");
        snapshot
    })
    .await?;

    debug!("Snapshot recorded for {} at {}", snapshot.bucket_name, snapshot.timestamp);
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Alarm-driven cleanup of the configured bucket
pub async fn cleanup_handler(app_state: web::Data<AppState>) -> std::result::Result<HttpResponse, Error> {
    let Some(bucket) = app_state.config.cleaner.bucket_name.clone() else {
        error!("Cleaner failed: no cleaner.bucket_name configured");
        return Ok(HttpResponse::InternalServerError().body(CLEANER_FAILED));
    };

    let cleaner = app_state.cleaner.clone();
    let result = run_blocking(app_state.config.ledger.call_timeout(), move || cleaner.delete_largest(&bucket)).await;

    match result {
        Ok(Some(deleted)) => Ok(HttpResponse::Ok().body(format!("Deleted {}", deleted.key))),
        Ok(None) => Ok(HttpResponse::Ok().body(NO_OBJECTS)),
        Err(e) => {
            error!("Cleaner failed: {}", e);
            Ok(HttpResponse::InternalServerError().body(CLEANER_FAILED))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Window in seconds, defaults to `history.window_secs`
    pub window: Option<u64>,
}

/// Recent snapshots of a bucket as JSON points
pub async fn history_handler(
    path: web::Path<String>,
    params: web::Query<HistoryParams>,
    app_state: web::Data<AppState>,
) -> std::result::Result<HttpResponse, Error> {
    let bucket = path.into_inner();
    let window = params.window.unwrap_or(app_state.config.history.window_secs);
    let history_service = app_state.history.clone();

    let history = run_blocking(app_state.config.ledger.call_timeout(), move || {
        history_service.recent(&bucket, window)
    })
    .await?;

    if history.is_empty() {
        return Ok(HttpResponse::Ok().body(NO_DATA));
    }
    Ok(HttpResponse::Ok().json(history))
}

/// Register every route on an actix `App`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/events/size", web::post().to(size_events_handler))
        .route("/events/log", web::post().to(log_events_handler))
        .route("/snapshots/{bucket}", web::post().to(snapshot_handler))
        .route("/cleanup", web::post().to(cleanup_handler))
        .route("/history/{bucket}", web::get().to(history_handler));
}
