//! Transport envelopes around storage notifications
//!
//! A delivered body can be a queue batch, a topic notification, a raw storage
//! notification, or any nesting of those (batch of topic notifications whose
//! message is a JSON string holding the storage notification). Each layer is
//! classified into an [`Envelope`] and peeled one step at a time.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LedgerError, Result};

/// Deepest envelope nesting accepted before a payload is rejected
pub const MAX_ENVELOPE_DEPTH: usize = 4;

/// One classified transport layer
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Queue batch or direct topic delivery; each entry is the next layer's payload
    Batch(Vec<Value>),
    /// Topic notification; holds the `Message` payload
    Topic(Value),
    /// Raw storage notification records
    Notification(Vec<Value>),
    /// A payload that carries no object mutation, such as a storage test event
    Ignored(String),
}

impl Envelope {
    /// Classify a JSON payload. String payloads are decoded first, which is how
    /// double-encoded bodies and topic messages arrive.
    pub fn classify(value: Value) -> Result<Envelope> {
        let value = match value {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| LedgerError::MalformedPayload(format!("embedded JSON is invalid: {}", e)))?,
            other => other,
        };

        let Value::Object(mut map) = value else {
            return Err(LedgerError::MalformedPayload("payload is not a JSON object".to_string()));
        };

        if let Some(records) = map.remove("Records") {
            let Value::Array(records) = records else {
                return Err(LedgerError::MalformedPayload("Records is not an array".to_string()));
            };
            if records.iter().any(|r| r.get("s3").is_some()) {
                return Ok(Envelope::Notification(records));
            }
            let payloads = records.into_iter().map(batch_entry_payload).collect();
            return Ok(Envelope::Batch(payloads));
        }

        if let Some(message) = map.remove("Message") {
            return Ok(Envelope::Topic(message));
        }

        if let Some(event) = map.get("Event").and_then(Value::as_str) {
            return Ok(Envelope::Ignored(event.to_string()));
        }

        Err(LedgerError::MalformedPayload("unrecognized envelope".to_string()))
    }
}

/// Payload carried by one batch entry: a queue `body` or a direct topic
/// delivery's `Sns.Message`. Entries with neither become `Null` and fail
/// classification on their own.
fn batch_entry_payload(mut entry: Value) -> Value {
    if let Some(body) = entry.get_mut("body").map(Value::take) {
        return body;
    }
    entry
        .get_mut("Sns")
        .and_then(|sns| sns.get_mut("Message"))
        .map(Value::take)
        .unwrap_or(Value::Null)
}

/// One record of a raw storage notification
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sequencer: Option<String>,
}
