//! SQLite implementation of SnapshotStore trait

use crate::error::{LedgerError, Result};
use crate::snapshot::{SizeSnapshot, SnapshotStore};
use crate::snapshot::config::SnapshotConfig;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use rusqlite::{params, Connection};
use log::info;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS size_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bucket_name TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        total_size INTEGER NOT NULL,
        object_count INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS size_history_bucket_ts ON size_history (bucket_name, timestamp);";

/// SQLite implementation of SnapshotStore
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open (or create) the snapshot database described by the configuration
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        let path = Path::new(&config.db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening snapshot database at {} (wal_mode: {})", path.display(), config.wal_mode);

        let conn = Connection::open(path)?;
        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        Self::from_connection(conn)
    }

    /// Snapshot store backed by a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("snapshot database"))
    }
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| LedgerError::SnapshotStore(format!("value {} does not fit the snapshot table", value)))
}

impl SnapshotStore for SqliteSnapshotStore {
    fn put_snapshot(&self, snapshot: &SizeSnapshot) -> Result<()> {
        let total_size = to_sql_int(snapshot.total_size)?;
        let object_count = to_sql_int(snapshot.object_count)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO size_history (bucket_name, timestamp, total_size, object_count) VALUES (?1, ?2, ?3, ?4)",
            params![snapshot.bucket_name, snapshot.timestamp, total_size, object_count],
        )?;
        Ok(())
    }

    fn query_snapshots(&self, bucket: &str, from: i64, to: i64) -> Result<Vec<SizeSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT bucket_name, timestamp, total_size, object_count FROM size_history
             WHERE bucket_name = ?1 AND timestamp BETWEEN ?2 AND ?3
             ORDER BY timestamp, id",
        )?;

        let rows = stmt.query_map(params![bucket, from, to], |row| {
            let total_size: i64 = row.get(2)?;
            let object_count: i64 = row.get(3)?;
            Ok(SizeSnapshot {
                bucket_name: row.get(0)?,
                timestamp: row.get(1)?,
                total_size: u64::try_from(total_size)
                    .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, total_size))?,
                object_count: u64::try_from(object_count)
                    .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, object_count))?,
            })
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?);
        }
        Ok(snapshots)
    }
}
