//! Configuration management for trendstore.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config dir.
const APP_DIR_NAME: &str = "trendstore";

/// Prefix for namespaced environment overrides.
const ENV_PREFIX: &str = "TRENDSTORE_";

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 9800;

/// Default database URL: a file in the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///trend.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. The plain `HOST`, `PORT` and `DATABASE_URL` environment variables
/// 2. Environment variables prefixed with `TRENDSTORE_` (nested with `__`)
/// 3. TOML config file at `~/.config/trendstore/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    pub cors_enabled: bool,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database connection string, e.g. `sqlite:///trend.db`.
    pub database_url: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive such as `trendstore=debug,tower_http=info`, used
    /// when neither `RUST_LOG` nor `-v`/`-q` is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Output format.
    pub format: LogFormat,
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, level, target and fields on one line.
    #[default]
    Full,
    /// Shorter lines with span context folded in.
    Compact,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_enabled: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Where the sample database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A transient in-memory database.
    Memory,
    /// A database file.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a database connection string.
    ///
    /// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db`,
    /// `sqlite://path`, `sqlite::memory:`, `:memory:` or a bare path.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty string or a non-sqlite scheme.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::ConfigValidation {
                message: "database_url must not be empty".to_string(),
            });
        }

        let rest = if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if url.contains("://") {
            return Err(Error::ConfigValidation {
                message: format!("unsupported database url: {url}"),
            });
        } else {
            url
        };

        if rest == ":memory:" || rest == "//:memory:" || rest == "///:memory:" {
            return Ok(Self::Memory);
        }

        // `sqlite:///x` is relative, `sqlite:////x` is absolute.
        let path = rest
            .strip_prefix("///")
            .or_else(|| rest.strip_prefix("//"))
            .unwrap_or(rest);
        if path.is_empty() {
            return Err(Error::ConfigValidation {
                message: format!("database url has no path: {url}"),
            });
        }

        Ok(Self::File(PathBuf::from(path)))
    }
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, ":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered configuration provider.
    #[must_use]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().filter_map(|key| {
                if key == "HOST" {
                    Some("server.host".into())
                } else if key == "PORT" {
                    Some("server.port".into())
                } else if key == "DATABASE_URL" {
                    Some("storage.database_url".into())
                } else {
                    None
                }
            }))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "host must not be empty".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "port must be greater than 0".to_string(),
            });
        }

        DatabaseLocation::parse(&self.storage.database_url)?;

        if let Some(filter) = &self.logging.filter {
            tracing_subscriber::EnvFilter::try_new(filter).map_err(|e| {
                Error::ConfigValidation {
                    message: format!("invalid logging filter {filter:?}: {e}"),
                }
            })?;
        }
        Ok(())
    }

    /// Resolve the configured database location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database URL cannot be parsed.
    pub fn database_location(&self) -> Result<DatabaseLocation> {
        DatabaseLocation::parse(&self.storage.database_url)
    }

    /// The `host:port` string to bind the HTTP server to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
