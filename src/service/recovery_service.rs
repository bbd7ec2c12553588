//! Deleted-object size recovery
//!
//! A removal notification does not carry the size of the object that was
//! removed. The size is recovered by replaying the size-delta records this
//! ledger previously wrote for the same key.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use serde_json::json;

use crate::clock::Clock;
use crate::config::RecoveryOrder;
use crate::logsink::{payload_of, LogEvent, LogQuery, LogSink};
use crate::record::SizeDeltaRecord;

/// Searches the structured log for the last known size of an object
pub struct SizeRecovery {
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    order: RecoveryOrder,
}

impl SizeRecovery {
    pub fn new(sink: Arc<dyn LogSink>, clock: Arc<dyn Clock>, order: RecoveryOrder) -> Self {
        Self { sink, clock, order }
    }

    /// Last known size of `key` within `lookback`, or `None` when no record matches
    /// or the sink cannot be queried.
    pub fn recover_size(&self, key: &str, lookback: Duration) -> Option<u64> {
        let end_ms = self.clock.now_ms();
        let lookback_ms = i64::try_from(lookback.as_millis()).unwrap_or(i64::MAX);
        let query = LogQuery::for_object(key, end_ms.saturating_sub(lookback_ms), end_ms);

        let mut best: Option<(i64, SizeDeltaRecord)> = None;
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = match self.sink.query(&query, token.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    error!("Error searching logs for {}: {}", key, e);
                    return None;
                }
            };
            pages += 1;

            for event in &page.events {
                if let Some(record) = Self::parse_record(event, key) {
                    best = match (self.order, best.take()) {
                        (RecoveryOrder::LatestTimestamp, Some((ts, kept))) if ts > event.timestamp_ms => {
                            Some((ts, kept))
                        }
                        _ => Some((event.timestamp_ms, record)),
                    };
                }
            }

            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        debug!("Searched {} log page(s) for {}", pages, key);
        best.map(|(_, record)| {
            let size = record.magnitude();
            info!("{}", json!({ "matched_size": size }));
            size
        })
    }

    fn parse_record(event: &LogEvent, key: &str) -> Option<SizeDeltaRecord> {
        let payload = payload_of(&event.message);
        match serde_json::from_str::<SizeDeltaRecord>(payload) {
            Ok(record) if record.object_name == key => Some(record),
            Ok(_) => None,
            Err(_) => {
                info!("{}", json!({ "error": "Could not parse JSON", "message": event.message }));
                None
            }
        }
    }
}
