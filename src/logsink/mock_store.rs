//! Mock implementation of LogSink trait for testing

use crate::error::{LedgerError, Result};
use crate::logsink::{LogEntry, LogEvent, LogPage, LogQuery, LogSink};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_PAGE_SIZE: usize = 50;

/// In-memory log sink. Query results come back in append order.
#[derive(Clone)]
pub struct MockLogSink {
    entries: Arc<Mutex<Vec<(LogEvent, Option<String>)>>>,
    page_size: usize,
    fail_queries: Arc<AtomicBool>,
    fail_appends: Arc<AtomicBool>,
    query_calls: Arc<AtomicUsize>,
}

impl MockLogSink {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a sink that returns at most `page_size` events per query page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            page_size: page_size.max(1),
            fail_queries: Arc::new(AtomicBool::new(false)),
            fail_appends: Arc::new(AtomicBool::new(false)),
            query_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, Vec<(LogEvent, Option<String>)>>> {
        self.entries
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("mock log sink"))
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of query pages requested so far
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Every appended line in append order
    pub fn messages(&self) -> Vec<String> {
        self.entries()
            .map(|entries| entries.iter().map(|(e, _)| e.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Every appended payload parsed as JSON, skipping lines that are not JSON
    pub fn json_payloads(&self) -> Vec<serde_json::Value> {
        self.messages()
            .iter()
            .filter_map(|m| serde_json::from_str(crate::logsink::payload_of(m)).ok())
            .collect()
    }
}

impl Default for MockLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MockLogSink {
    fn append(&self, entry: LogEntry) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(LedgerError::LogSink("mock log sink rejected append".to_string()));
        }
        let mut entries = self.entries()?;
        let id = entries.len() as u64 + 1;
        entries.push((
            LogEvent {
                id,
                timestamp_ms: entry.timestamp_ms,
                message: entry.message,
            },
            entry.event_id,
        ));
        Ok(())
    }

    fn query(&self, query: &LogQuery, next_token: Option<&str>) -> Result<LogPage> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(LedgerError::LogSink("mock log sink query failed".to_string()));
        }

        let after_id = match next_token {
            Some(token) => token
                .parse::<u64>()
                .map_err(|_| LedgerError::LogSink(format!("invalid continuation token: {}", token)))?,
            None => 0,
        };

        let entries = self.entries()?;
        let mut events: Vec<LogEvent> = entries
            .iter()
            .map(|(event, _)| event)
            .filter(|e| e.id > after_id && query.matches(e.timestamp_ms, &e.message))
            .take(self.page_size + 1)
            .cloned()
            .collect();

        let next_token = if events.len() > self.page_size {
            events.truncate(self.page_size);
            events.last().map(|e| e.id.to_string())
        } else {
            None
        };

        Ok(LogPage { events, next_token })
    }

    fn contains_event_id(&self, event_id: &str) -> Result<bool> {
        let entries = self.entries()?;
        Ok(entries.iter().any(|(_, id)| id.as_deref() == Some(event_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, delta: i64) -> String {
        format!("{{\"object_name\": \"{}\", \"size_delta\": {}}}", name, delta)
    }

    #[test]
    fn test_mock_log_sink_basic_operations() {
        let sink = MockLogSink::new();
        sink.append(LogEntry { timestamp_ms: 10, message: line("a", 1), event_id: Some("e1".into()) }).unwrap();
        sink.append(LogEntry { timestamp_ms: 20, message: line("b", 2), event_id: None }).unwrap();

        assert_eq!(sink.messages().len(), 2);
        assert!(sink.contains_event_id("e1").unwrap());
        assert!(!sink.contains_event_id("e2").unwrap());

        let page = sink.query(&LogQuery::for_object("a", 0, 100), None).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].timestamp_ms, 10);
        assert_eq!(page.next_token, None);
    }

    #[test]
    fn test_mock_log_sink_pages() {
        let sink = MockLogSink::with_page_size(2);
        for i in 0..5 {
            sink.append(LogEntry { timestamp_ms: i, message: line("k", i), event_id: None }).unwrap();
        }

        let query = LogQuery::for_object("k", 0, 100);
        let mut token = None;
        let mut seen = 0;
        loop {
            let page = sink.query(&query, token.as_deref()).unwrap();
            seen += page.events.len();
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        assert_eq!(seen, 5);
        assert_eq!(sink.query_calls(), 3);
    }

    #[test]
    fn test_mock_log_sink_error_cases() {
        let sink = MockLogSink::new();
        sink.set_fail_appends(true);
        assert!(sink.append(LogEntry { timestamp_ms: 0, message: "x".into(), event_id: None }).is_err());

        sink.set_fail_queries(true);
        assert!(sink.query(&LogQuery::for_object("k", 0, 1), None).is_err());

        sink.set_fail_queries(false);
        assert!(sink.query(&LogQuery::for_object("k", 0, 1), Some("garbage")).is_err());
    }
}
