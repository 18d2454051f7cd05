//! Storage layer for trendstore.
//!
//! This module provides the `SQLite`-backed trend store: appending samples,
//! listing keys, and reading recent windows or full histories in
//! chronological order.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DatabaseLocation;
use crate::error::{Error, Result};
use crate::sample::{format_timestamp, ChartPoint, Limit, NewSample, Sample};

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INSERT_SAMPLE: &str = "INSERT INTO trend_data (key, value, timestamp) VALUES (?1, ?2, ?3)";

const SELECT_BY_ID: &str = "SELECT id, key, value, timestamp FROM trend_data WHERE id = ?1";

const RECENT_ALL: &str = r"
SELECT id, key, value, timestamp FROM trend_data
ORDER BY timestamp DESC, id DESC LIMIT ?1
";

const RECENT_BY_KEY: &str = r"
SELECT id, key, value, timestamp FROM trend_data WHERE key = ?1
ORDER BY timestamp DESC, id DESC LIMIT ?2
";

const HISTORY_ALL: &str = r"
SELECT id, key, value, timestamp FROM trend_data
ORDER BY timestamp ASC, id ASC
";

const HISTORY_BY_KEY: &str = r"
SELECT id, key, value, timestamp FROM trend_data WHERE key = ?1
ORDER BY timestamp ASC, id ASC
";

/// The trend store.
///
/// Owns a single `SQLite` connection behind a mutex. Every operation holds
/// the lock for exactly one statement or transaction, so readers never see a
/// half-written sample. `Storage` is `Sync` and meant to be shared via `Arc`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets readers proceed while an append is committing.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Open the database described by a configured location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_location(location: &DatabaseLocation) -> Result<Self> {
        match location {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => Self::open(path),
        }
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the connection. The guard releases it on every exit path.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Append a sample, stamping it with the current UTC time.
    ///
    /// The insert runs in its own transaction; on error nothing is persisted.
    /// The timestamp is taken inside that transaction and never falls behind
    /// the newest stored sample, so timestamp order always agrees with id
    /// order even if the system clock steps backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append(&self, sample: &NewSample) -> Result<Sample> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let newest: Option<String> =
            tx.query_row("SELECT MAX(timestamp) FROM trend_data", [], |row| row.get(0))?;
        let now = Utc::now().trunc_subsecs(6);
        let timestamp = newest
            .as_deref()
            .and_then(parse_timestamp)
            .map_or(now, |newest| newest.max(now));

        tx.execute(
            INSERT_SAMPLE,
            params![sample.key(), sample.value(), format_timestamp(&timestamp)],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, key = sample.key(), value = sample.value(), "Appended sample");
        Ok(Sample {
            id,
            key: sample.key().to_string(),
            value: sample.value(),
            timestamp,
        })
    }

    /// List the distinct keys across all samples.
    ///
    /// The order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT key FROM trend_data")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get the most recent samples, oldest first.
    ///
    /// Selects the newest `limit` samples (by timestamp, then id) and returns
    /// them in ascending order. A `None` or empty key means every series.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_samples(&self, key: Option<&str>, limit: Limit) -> Result<Vec<Sample>> {
        let limit = i64::from(limit.get());
        let conn = self.lock()?;

        let mut samples = match key_filter(key) {
            Some(key) => query_samples(&conn, RECENT_BY_KEY, params![key, limit])?,
            None => query_samples(&conn, RECENT_ALL, params![limit])?,
        };
        samples.reverse();
        Ok(samples)
    }

    /// Get the recent window for a key as chart points, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_window(&self, key: Option<&str>, limit: Limit) -> Result<Vec<ChartPoint>> {
        Ok(self
            .recent_samples(key, limit)?
            .iter()
            .map(Sample::to_chart_point)
            .collect())
    }

    /// Get every sample for a key, ordered by timestamp then id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn full_history(&self, key: Option<&str>) -> Result<Vec<Sample>> {
        let conn = self.lock()?;
        match key_filter(key) {
            Some(key) => query_samples(&conn, HISTORY_BY_KEY, params![key]),
            None => query_samples(&conn, HISTORY_ALL, []),
        }
    }

    /// Get a sample by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Sample>> {
        let conn = self.lock()?;
        let sample = conn
            .query_row(SELECT_BY_ID, [id], row_to_sample)
            .optional()?;
        Ok(sample)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.lock()?;

        let (total_samples, distinct_keys, oldest, newest): (
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT key), MIN(timestamp), MAX(timestamp) FROM trend_data",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        drop(conn);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map_or(0, |m| m.len())
        };

        Ok(StorageStats {
            total_samples,
            distinct_keys,
            oldest_sample: oldest.as_deref().and_then(parse_timestamp),
            newest_sample: newest.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Total number of samples stored.
    pub total_samples: i64,
    /// Number of distinct keys.
    pub distinct_keys: i64,
    /// Timestamp of the oldest sample.
    pub oldest_sample: Option<DateTime<Utc>>,
    /// Timestamp of the newest sample.
    pub newest_sample: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// An empty key filter means "all series".
fn key_filter(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.is_empty())
}

fn query_samples<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Sample>> {
    let mut stmt = conn.prepare(sql)?;
    let samples = stmt
        .query_map(params, row_to_sample)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(samples)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a database row to a Sample.
fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<Sample> {
    let timestamp_str: String = row.get(3)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(Sample {
        id: row.get(0)?,
        key: row.get(1)?,
        value: row.get(2)?,
        timestamp,
    })
}
