//! Core sample types for trendstore.
//!
//! A [`Sample`] is one timestamped observation of a keyed series. Samples are
//! built from a validated [`NewSample`] by the storage layer, which assigns
//! the id and the timestamp.

use std::num::NonZeroU32;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Maximum length of a series key, in characters.
pub const MAX_KEY_LEN: usize = 256;

/// Number of samples returned by a recent window when no limit is given.
pub const DEFAULT_WINDOW_LIMIT: u32 = 100;

/// Display format used for the `x` field of chart points.
const CHART_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Identifier assigned by the store on creation.
    pub id: i64,
    /// Series the sample belongs to.
    pub key: String,
    /// Observed value.
    pub value: f64,
    /// When the sample was recorded (UTC, microsecond precision).
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Project this sample onto a chart point.
    #[must_use]
    pub fn to_chart_point(&self) -> ChartPoint {
        ChartPoint {
            x: self.timestamp.format(CHART_TIMESTAMP_FORMAT).to_string(),
            y: self.value,
        }
    }
}

/// Display projection of a sample: formatted time on `x`, value on `y`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub x: String,
    /// The sample value.
    pub y: f64,
}

impl From<&Sample> for ChartPoint {
    fn from(sample: &Sample) -> Self {
        sample.to_chart_point()
    }
}

/// A validated sample that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    key: String,
    value: f64,
}

impl NewSample {
    /// Validate a key and value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for an empty key, [`Error::InvalidKey`]
    /// for an over-long key and [`Error::InvalidValue`] for a value that is
    /// not finite.
    pub fn new(key: impl Into<String>, value: f64) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::MissingField);
        }
        if key.chars().count() > MAX_KEY_LEN {
            return Err(Error::invalid_key(format!(
                "key must be at most {MAX_KEY_LEN} characters"
            )));
        }
        if !value.is_finite() {
            return Err(Error::InvalidValue);
        }
        Ok(Self { key, value })
    }

    /// The series key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The observed value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Coerce a loosely-typed JSON value into a finite `f64`.
///
/// Numbers are taken as-is; strings are parsed as decimal, integer or float
/// literals with surrounding whitespace ignored. Everything else is rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] if the value is not a finite number.
pub fn parse_value(raw: &serde_json::Value) -> Result<f64> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value.filter(|v| v.is_finite()).ok_or(Error::InvalidValue)
}

/// Maximum number of samples in a recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(NonZeroU32);

impl Limit {
    /// Create a limit from a positive count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `n` is zero.
    pub fn new(n: u32) -> Result<Self> {
        NonZeroU32::new(n).map(Self).ok_or_else(Self::invalid)
    }

    /// Parse a limit from an optional query-string value.
    ///
    /// An absent or blank value gives the default. Zero, negative and
    /// non-integer values are rejected; values beyond `u32::MAX` saturate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the value is not a positive integer.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        let n: i64 = raw.parse().map_err(|_| Self::invalid())?;
        if n <= 0 {
            return Err(Self::invalid());
        }
        Self::new(u32::try_from(n).unwrap_or(u32::MAX))
    }

    /// The limit as a count.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    fn invalid() -> Error {
        Error::invalid_parameter("limit", "limit must be a positive integer")
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(NonZeroU32::new(DEFAULT_WINDOW_LIMIT).unwrap_or(NonZeroU32::MIN))
    }
}

/// Format a timestamp the way it is stored and serialized.
///
/// Fixed width (microseconds, `Z` suffix) so that string order is time order.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}
