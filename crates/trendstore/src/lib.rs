//! `trendstore` - A minimal time-series reporting service
//!
//! Clients push `(key, value)` samples; the store timestamps and persists
//! them in `SQLite`, and consumers read back recent windows or full
//! histories per key over HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod sample;
pub mod storage;

pub use api::AppState;
pub use config::{Config, DatabaseLocation, LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use sample::{ChartPoint, Limit, NewSample, Sample};
pub use storage::{Storage, StorageStats};
