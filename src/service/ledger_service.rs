//! Size ledger service
//!
//! Owns the two write paths of the pipeline: full recomputes that append a
//! size snapshot for a bucket, and the per-event size-delta log.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::events::{EventKind, StorageEvent};
use crate::logsink::{LogEntry, LogSink};
use crate::record::{LogRecord, SizeDeltaRecord};
use crate::service::recovery_service::SizeRecovery;
use crate::snapshot::{SizeSnapshot, SnapshotStore};
use crate::storage::{ObjectListing, ObjectStore};

/// What happened to one storage event on the logging path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A line was appended to the log sink
    Appended(LogRecord),
    /// The event id was already logged and dedupe is enabled
    Skipped,
}

/// Tally of a batch run through the logging path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub appended: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &Result<EventOutcome>) {
        match outcome {
            Ok(EventOutcome::Appended(LogRecord::Warning { .. })) => {
                self.appended += 1;
                self.warnings += 1;
            }
            Ok(EventOutcome::Appended(_)) => self.appended += 1,
            Ok(EventOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Maintains the snapshot series and the size-delta log
pub struct SizeLedger {
    objects: Arc<dyn ObjectStore>,
    snapshots: Arc<dyn SnapshotStore>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    recovery: SizeRecovery,
    lookback: Duration,
    dedupe_events: bool,
}

impl SizeLedger {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        snapshots: Arc<dyn SnapshotStore>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        config: &LedgerConfig,
    ) -> Self {
        let recovery = SizeRecovery::new(Arc::clone(&sink), Arc::clone(&clock), config.recovery_order);
        Self {
            objects,
            snapshots,
            sink,
            clock,
            recovery,
            lookback: config.lookback(),
            dedupe_events: config.dedupe_events,
        }
    }

    /// Total size and object count of a bucket, walking every listing page
    pub fn bucket_totals(&self, bucket: &str) -> Result<(u64, u64)> {
        let mut listing = ObjectListing::new(self.objects.as_ref(), bucket);
        let mut total_size = 0u64;
        let mut object_count = 0u64;

        for object in listing.by_ref() {
            let object = object.map_err(|e| LedgerError::LedgerUnavailable {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;
            total_size = total_size.saturating_add(object.size);
            object_count += 1;
        }

        debug!(
            "Bucket {} holds {} objects, {} bytes ({} pages)",
            bucket,
            object_count,
            total_size,
            listing.pages_fetched()
        );
        Ok((total_size, object_count))
    }

    /// Recompute the bucket totals and append a snapshot stamped with the current time
    pub fn record_snapshot(&self, bucket: &str) -> Result<SizeSnapshot> {
        let (total_size, object_count) = self.bucket_totals(bucket)?;
        let snapshot = SizeSnapshot::new(bucket, self.clock.now_secs(), total_size, object_count);
        self.snapshots.put_snapshot(&snapshot)?;

        info!(
            "Recorded snapshot for {}: total_size={} object_count={} at {}",
            bucket, snapshot.total_size, snapshot.object_count, snapshot.timestamp
        );
        Ok(snapshot)
    }

    /// Translate one storage event into exactly one appended log line
    pub fn on_storage_event(&self, event: &StorageEvent) -> Result<EventOutcome> {
        if self.dedupe_events && self.sink.contains_event_id(&event.event_id)? {
            info!("Skipping already logged event {} for {}", event.event_id, event.object_key);
            return Ok(EventOutcome::Skipped);
        }

        let record = match &event.kind {
            EventKind::Created => {
                let size = event.size.ok_or_else(|| {
                    LedgerError::MalformedPayload(format!("created event for {} carries no size", event.object_key))
                })?;
                LogRecord::Delta(SizeDeltaRecord::created(&event.object_key, size))
            }
            EventKind::Removed => match self.recovery.recover_size(&event.object_key, self.lookback) {
                Some(size) => LogRecord::Delta(SizeDeltaRecord::removed(&event.object_key, size)),
                None => {
                    warn!("Size not found for deleted object: {}", event.object_key);
                    LogRecord::warning(format!("Size not found for deleted object: {}", event.object_key))
                }
            },
            EventKind::Other(name) => {
                warn!("Unhandled event type: {}", name);
                LogRecord::warning(format!("Unhandled event type: {}", name))
            }
        };

        self.append_record(&record, Some(&event.event_id))?;
        Ok(EventOutcome::Appended(record))
    }

    /// Append one record to the sink, tagged with the originating event id
    pub fn append_record(&self, record: &LogRecord, event_id: Option<&str>) -> Result<()> {
        let line = record.to_line()?;
        self.sink.append(LogEntry {
            timestamp_ms: self.clock.now_ms(),
            message: line.clone(),
            event_id: event_id.map(str::to_string),
        })?;
        info!("{}", line);
        Ok(())
    }

    /// Process one event; on failure also try to leave an error line in the sink
    pub fn handle_event(&self, event: &StorageEvent) -> Result<EventOutcome> {
        let outcome = self.on_storage_event(event);
        if let Err(e) = &outcome {
            self.log_failure(&e.to_string());
        }
        outcome
    }

    /// Best effort: the sink itself may be what failed
    pub fn log_failure(&self, details: &str) {
        error!("Logging failed: {}", details);
        if let Err(e) = self.append_record(&LogRecord::error("Logging failed", details), None) {
            error!("Could not record failure in log sink: {}", e);
        }
    }

    /// Process events in delivery order; a failing event never stops later ones
    pub fn process_events(&self, events: &[StorageEvent]) -> BatchReport {
        let mut report = BatchReport::default();
        for event in events {
            report.record(&self.handle_event(event));
        }
        report
    }
}
