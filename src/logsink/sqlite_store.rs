//! SQLite implementation of LogSink trait
//!
//! The `object_name` of each payload is extracted at append time into its own
//! indexed column so that filtered queries never need to parse stored lines.

use crate::error::{LedgerError, Result};
use crate::logsink::{object_name_of, LogEntry, LogEvent, LogPage, LogQuery, LogSink};
use crate::logsink::config::LogSinkConfig;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use rusqlite::{params, Connection};
use log::info;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS log_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp_ms INTEGER NOT NULL,
        object_name TEXT,
        event_id TEXT,
        message TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS log_events_object_ts ON log_events (object_name, timestamp_ms);
    CREATE INDEX IF NOT EXISTS log_events_event_id ON log_events (event_id);";

/// SQLite implementation of LogSink
pub struct SqliteLogSink {
    conn: Mutex<Connection>,
    page_size: usize,
}

impl SqliteLogSink {
    pub fn new(config: &LogSinkConfig) -> Result<Self> {
        let path = Path::new(&config.db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening log sink database at {}", path.display());

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn, config.page_size)
    }

    /// Log sink backed by a private in-memory database
    pub fn in_memory(page_size: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, page_size)
    }

    fn from_connection(conn: Connection, page_size: usize) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            page_size: page_size.max(1),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("log sink database"))
    }
}

impl LogSink for SqliteLogSink {
    fn append(&self, entry: LogEntry) -> Result<()> {
        let object_name = object_name_of(&entry.message);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO log_events (timestamp_ms, object_name, event_id, message) VALUES (?1, ?2, ?3, ?4)",
            params![entry.timestamp_ms, object_name, entry.event_id, entry.message],
        )?;
        Ok(())
    }

    fn query(&self, query: &LogQuery, next_token: Option<&str>) -> Result<LogPage> {
        let after_id: i64 = match next_token {
            Some(token) => token
                .parse()
                .map_err(|_| LedgerError::LogSink(format!("invalid continuation token: {}", token)))?,
            None => 0,
        };
        // One extra row tells us whether another page exists
        let limit = i64::try_from(self.page_size + 1).unwrap_or(i64::MAX);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp_ms, message FROM log_events
             WHERE timestamp_ms BETWEEN ?1 AND ?2
               AND (?3 IS NULL OR object_name = ?3)
               AND id > ?4
             ORDER BY id
             LIMIT ?5",
        )?;
        let rows = stmt.query_map(
            params![query.start_ms, query.end_ms, query.object_name, after_id, limit],
            |row| {
                let id: i64 = row.get(0)?;
                Ok(LogEvent {
                    id: u64::try_from(id).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, id))?,
                    timestamp_ms: row.get(1)?,
                    message: row.get(2)?,
                })
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }

        let next_token = if events.len() > self.page_size {
            events.truncate(self.page_size);
            events.last().map(|e| e.id.to_string())
        } else {
            None
        };

        Ok(LogPage { events, next_token })
    }

    fn contains_event_id(&self, event_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM log_events WHERE event_id = ?1",
            params![event_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timestamp_ms: i64, message: &str) -> LogEntry {
        LogEntry {
            timestamp_ms,
            message: message.to_string(),
            event_id: None,
        }
    }

    #[test]
    fn test_sqlite_log_sink_basic_operations() {
        let sink = SqliteLogSink::in_memory(10).unwrap();
        sink.append(entry(100, "{\"object_name\": \"a.txt\", \"size_delta\": 100}")).unwrap();
        sink.append(entry(150, "{\"warning\": \"Unhandled event type: ObjectRestore:Post\"}")).unwrap();
        sink.append(entry(200, "INFO\t{\"object_name\": \"b.txt\", \"size_delta\": 5}")).unwrap();

        let page = sink.query(&LogQuery::for_object("a.txt", 0, 1000), None).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].timestamp_ms, 100);

        // Prefixed lines are indexed by their payload
        let page = sink.query(&LogQuery::for_object("b.txt", 0, 1000), None).unwrap();
        assert_eq!(page.events.len(), 1);

        let all = sink.query(&LogQuery { start_ms: 0, end_ms: 1000, object_name: None }, None).unwrap();
        assert_eq!(all.events.len(), 3);

        let windowed = sink.query(&LogQuery::for_object("a.txt", 101, 1000), None).unwrap();
        assert!(windowed.events.is_empty());
    }

    #[test]
    fn test_sqlite_log_sink_pagination() {
        let sink = SqliteLogSink::in_memory(2).unwrap();
        for i in 0..5 {
            sink.append(entry(i, &format!("{{\"object_name\": \"k\", \"size_delta\": {}}}", i))).unwrap();
        }

        let query = LogQuery::for_object("k", 0, 100);
        let first = sink.query(&query, None).unwrap();
        assert_eq!(first.events.len(), 2);
        let second = sink.query(&query, first.next_token.as_deref()).unwrap();
        assert_eq!(second.events.len(), 2);
        let third = sink.query(&query, second.next_token.as_deref()).unwrap();
        assert_eq!(third.events.len(), 1);
        assert_eq!(third.next_token, None);

        assert!(sink.query(&query, Some("not-a-number")).is_err());
    }

    #[test]
    fn test_sqlite_log_sink_event_ids() {
        let sink = SqliteLogSink::in_memory(10).unwrap();
        sink.append(LogEntry {
            timestamp_ms: 1,
            message: "{\"object_name\": \"a\", \"size_delta\": 1}".to_string(),
            event_id: Some("abc123".to_string()),
        })
        .unwrap();

        assert!(sink.contains_event_id("abc123").unwrap());
        assert!(!sink.contains_event_id("other").unwrap());
    }
}
