//! `SQLite` schema definitions for trendstore.
//!
//! This module contains the SQL statements for creating the database schema.

/// SQL statement to create the sample table.
pub const CREATE_TREND_DATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trend_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL,
    value REAL NOT NULL,
    timestamp TEXT NOT NULL
)
";

/// SQL statement to create an index on `key` for per-series filtering.
pub const CREATE_KEY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trend_data_key ON trend_data(key)
";

/// SQL statement to create an index on `timestamp` for ordered scans.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trend_data_timestamp ON trend_data(timestamp)
";

/// SQL statement to create a composite index for keyed, time-ordered windows.
pub const CREATE_KEY_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trend_data_key_timestamp ON trend_data(key, timestamp, id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_TREND_DATA_TABLE,
    CREATE_KEY_INDEX,
    CREATE_TIMESTAMP_INDEX,
    CREATE_KEY_TIMESTAMP_INDEX,
    CREATE_METADATA_TABLE,
];
