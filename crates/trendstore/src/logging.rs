//! Logging setup for trendstore.
//!
//! The active filter is chosen in this order: `RUST_LOG`, then an explicit
//! `-v`/`-q` on the command line, then `[logging] filter` from the
//! configuration, then a default covering this crate and the HTTP layer.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive covering this crate and the HTTP layer.
    #[must_use]
    pub fn default_directive(&self) -> String {
        let level = self.to_level_filter();
        format!("trendstore={level},tower_http={level}")
    }
}

/// The filter directive to use when `RUST_LOG` is unset.
///
/// A configured filter applies only at [`Verbosity::Normal`]; `-v` or `-q`
/// on the command line replaces it.
#[must_use]
pub fn filter_directive(verbosity: Verbosity, config: &LoggingConfig) -> String {
    match (&config.filter, verbosity) {
        (Some(filter), Verbosity::Normal) => filter.clone(),
        _ => verbosity.default_directive(),
    }
}

/// Install the global subscriber.
///
/// Call once at startup, after the configuration is loaded. Later calls are
/// no-ops.
///
/// # Examples
///
/// ```no_run
/// use trendstore::config::LoggingConfig;
/// use trendstore::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose, &LoggingConfig::default());
/// ```
pub fn init_logging(verbosity: Verbosity, config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity, config)));

    let compact = config.format == LogFormat::Compact;
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(compact.then(|| fmt::layer().compact().with_target(true)))
        .with((!compact).then(|| {
            fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
        }));

    // Already installed.
    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
///
/// Only warnings and errors, routed through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
