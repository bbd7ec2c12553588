//! Storage event normalization
//!
//! Turns a delivered transport body into the flat sequence of storage events
//! it carries, in delivery order. Only an unreadable top-level body fails the
//! whole call; anything malformed further down is logged and skipped.

pub mod envelope;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::events::envelope::{Envelope, NotificationRecord, MAX_ENVELOPE_DEPTH};

/// Kind of object mutation a notification describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Removed,
    Other(String),
}

impl EventKind {
    pub fn from_event_name(event_name: &str) -> Self {
        if event_name.starts_with("ObjectCreated") {
            EventKind::Created
        } else if event_name.starts_with("ObjectRemoved") {
            EventKind::Removed
        } else {
            EventKind::Other(event_name.to_string())
        }
    }
}

/// Normalized view of one create/remove notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub object_key: String,
    /// Event name exactly as delivered, e.g. `ObjectCreated:Put`
    pub event_name: String,
    pub kind: EventKind,
    /// Object size in bytes, present only for created objects
    pub size: Option<u64>,
    /// Stable identifier of the notification, identical across redeliveries
    pub event_id: String,
}

impl StorageEvent {
    fn from_record(record: NotificationRecord) -> Result<Self> {
        let kind = EventKind::from_event_name(&record.event_name);
        let size = match kind {
            EventKind::Created => Some(record.s3.object.size.ok_or_else(|| {
                LedgerError::MalformedPayload(format!(
                    "created event for {} carries no size",
                    record.s3.object.key
                ))
            })?),
            _ => None,
        };

        let ordering = record
            .s3
            .object
            .sequencer
            .as_deref()
            .or(record.event_time.as_deref())
            .unwrap_or_default();
        let event_id = event_id_for(&record.s3.bucket.name, &record.s3.object.key, &record.event_name, ordering);

        Ok(Self {
            bucket: record.s3.bucket.name,
            object_key: record.s3.object.key,
            event_name: record.event_name,
            kind,
            size,
            event_id,
        })
    }
}

/// Hex MD5 over the fields that identify one notification
pub fn event_id_for(bucket: &str, key: &str, event_name: &str, ordering: &str) -> String {
    let digest = md5::compute(format!("{}|{}|{}|{}", bucket, key, event_name, ordering));
    hex::encode(digest.0)
}

/// Unwrap every envelope layer of a delivered body into storage events
pub fn normalize(raw: &[u8]) -> Result<Vec<StorageEvent>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| LedgerError::MalformedPayload(format!("body is not JSON: {}", e)))?;
    let envelope = Envelope::classify(value)?;

    let mut events = Vec::new();
    unwrap_into(envelope, 0, &mut events);
    Ok(events)
}

fn unwrap_into(envelope: Envelope, depth: usize, out: &mut Vec<StorageEvent>) {
    match envelope {
        Envelope::Batch(payloads) => {
            for (index, payload) in payloads.into_iter().enumerate() {
                unwrap_nested(payload, depth + 1, out, || format!("batch record {}", index));
            }
        }
        Envelope::Topic(message) => unwrap_nested(message, depth + 1, out, || "topic message".to_string()),
        Envelope::Notification(records) => {
            for (index, record) in records.into_iter().enumerate() {
                let parsed = serde_json::from_value::<NotificationRecord>(record)
                    .map_err(LedgerError::from)
                    .and_then(StorageEvent::from_record);
                match parsed {
                    Ok(event) => out.push(event),
                    Err(e) => warn!("Skipping malformed notification record {}: {}", index, e),
                }
            }
        }
        Envelope::Ignored(reason) => info!("Ignoring payload without object mutation: {}", reason),
    }
}

fn unwrap_nested<F>(payload: Value, depth: usize, out: &mut Vec<StorageEvent>, describe: F)
where
    F: Fn() -> String,
{
    if depth > MAX_ENVELOPE_DEPTH {
        warn!("Skipping {}: envelope nesting deeper than {}", describe(), MAX_ENVELOPE_DEPTH);
        return;
    }
    match Envelope::classify(payload) {
        Ok(envelope) => unwrap_into(envelope, depth, out),
        Err(e) => warn!("Skipping {}: {}", describe(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s3_notification(records: Vec<Value>) -> Value {
        json!({ "Records": records })
    }

    fn s3_record(event_name: &str, key: &str, size: Option<u64>) -> Value {
        let mut object = json!({"key": key, "sequencer": "0055AED6DCD90281E5"});
        if let Some(size) = size {
            object["size"] = json!(size);
        }
        json!({
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventTime": "2024-05-01T10:00:00.000Z",
            "eventName": event_name,
            "s3": {"bucket": {"name": "test-bucket"}, "object": object}
        })
    }

    fn topic(message: &Value) -> Value {
        json!({"Type": "Notification", "TopicArn": "arn:topic", "Message": message.to_string()})
    }

    fn queue_batch(bodies: Vec<String>) -> Value {
        let records: Vec<Value> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| json!({"messageId": i.to_string(), "body": body}))
            .collect();
        json!({ "Records": records })
    }

    #[test]
    fn test_direct_notification() {
        let raw = s3_notification(vec![s3_record("ObjectCreated:Put", "a.txt", Some(100))]);
        let events = normalize(raw.to_string().as_bytes()).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bucket, "test-bucket");
        assert_eq!(events[0].object_key, "a.txt");
        assert_eq!(events[0].kind, EventKind::Created);
        assert_eq!(events[0].size, Some(100));
        assert_eq!(events[0].event_id.len(), 32);
    }

    #[test]
    fn test_queue_of_topic_of_notification() {
        let first = s3_notification(vec![
            s3_record("ObjectCreated:Put", "a.txt", Some(100)),
            s3_record("ObjectRemoved:Delete", "b.txt", None),
        ]);
        let second = s3_notification(vec![s3_record("ObjectRestore:Completed", "c.txt", None)]);
        let raw = queue_batch(vec![topic(&first).to_string(), topic(&second).to_string()]);

        let events = normalize(raw.to_string().as_bytes()).unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Created,
                EventKind::Removed,
                EventKind::Other("ObjectRestore:Completed".to_string()),
            ]
        );
        assert_eq!(events[1].size, None);
    }

    #[test]
    fn test_malformed_record_does_not_stop_batch() {
        let good = s3_notification(vec![s3_record("ObjectCreated:Put", "late.txt", Some(7))]);
        let raw = queue_batch(vec![
            "{this is not json".to_string(),
            topic(&s3_notification(vec![s3_record("ObjectCreated:Put", "nosize.txt", None)])).to_string(),
            topic(&good).to_string(),
        ]);

        let events = normalize(raw.to_string().as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].object_key, "late.txt");
    }

    #[test]
    fn test_top_level_garbage_fails() {
        assert!(matches!(normalize(b"not json"), Err(LedgerError::MalformedPayload(_))));
        assert!(matches!(normalize(b"{\"foo\": 1}"), Err(LedgerError::MalformedPayload(_))));
    }

    #[test]
    fn test_test_event_yields_nothing() {
        let raw = topic(&json!({"Service": "Amazon S3", "Event": "s3:TestEvent"}));
        assert!(normalize(raw.to_string().as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_excessive_nesting_is_skipped() {
        let mut payload = s3_notification(vec![s3_record("ObjectCreated:Put", "deep.txt", Some(1))]);
        for _ in 0..(MAX_ENVELOPE_DEPTH + 2) {
            payload = topic(&payload);
        }
        assert!(normalize(payload.to_string().as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_event_id_is_stable_across_redelivery() {
        let raw = s3_notification(vec![s3_record("ObjectCreated:Put", "a.txt", Some(100))]);
        let once = normalize(raw.to_string().as_bytes()).unwrap();
        let again = normalize(topic(&raw).to_string().as_bytes()).unwrap();
        assert_eq!(once[0].event_id, again[0].event_id);

        let other = event_id_for("test-bucket", "a.txt", "ObjectRemoved:Delete", "0055AED6DCD90281E5");
        assert_ne!(once[0].event_id, other);
    }
}
