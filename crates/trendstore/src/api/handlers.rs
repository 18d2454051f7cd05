//! HTTP handlers for the trendstore API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use super::AppState;
use crate::error::{Error, Result};
use crate::sample::{parse_value, ChartPoint, Limit, NewSample, Sample};
use crate::storage::Storage;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Body of `POST /api/report`, before validation.
///
/// Fields are kept as raw JSON text so that a number too large for `f64`
/// still reaches value validation instead of failing the whole body.
#[derive(Debug, Default)]
pub struct ReportRequest {
    /// Series key; expected to be a non-empty string.
    pub key: Option<Box<RawValue>>,
    /// Sample value; a number or a numeric string.
    pub value: Option<Box<RawValue>>,
}

impl ReportRequest {
    /// Parse a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] if the body is empty, not JSON, or not a
    /// non-empty JSON object.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let mut fields: HashMap<String, Box<RawValue>> =
            serde_json::from_slice(body).map_err(|_| Error::NoData)?;
        if fields.is_empty() {
            return Err(Error::NoData);
        }

        Ok(Self {
            key: fields.remove("key"),
            value: fields.remove("value"),
        })
    }

    /// Check the fields and build a sample ready to append.
    ///
    /// A falsy key (`""`, `false`, `0`, `null`, `[]`, `{}`) counts as
    /// missing; any other non-string key is rejected as invalid.
    ///
    /// # Errors
    ///
    /// Returns a client input error describing the first problem found.
    pub fn validate(&self) -> Result<NewSample> {
        let (Some(key), Some(value)) = (present(self.key.as_deref()), present(self.value.as_deref()))
        else {
            return Err(Error::MissingField);
        };

        let key = match serde_json::from_str::<Value>(key.get()) {
            Ok(key) if is_falsy(&key) => return Err(Error::MissingField),
            Ok(Value::String(key)) => key,
            _ => return Err(Error::invalid_key("key must be a string")),
        };

        // Valid JSON that still fails to parse is a number outside f64 range.
        let value = serde_json::from_str::<Value>(value.get()).map_err(|_| Error::InvalidValue)?;
        NewSample::new(key, parse_value(&value)?)
    }
}

/// A field given as JSON `null` is treated as absent.
fn present(raw: Option<&RawValue>) -> Option<&RawValue> {
    raw.filter(|raw| raw.get() != "null")
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Unwrap query parameters, reporting a malformed query string as a JSON
/// client error rather than axum's plain-text rejection.
fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| Error::invalid_parameter("query", rejection.body_text()))
}

/// Body of a successful `POST /api/report`.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Id assigned to the new sample.
    pub id: i64,
}

/// Query string of `GET /api/data`.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    /// Restrict to one series.
    pub key: Option<String>,
    /// Maximum number of points; defaults to 100.
    pub limit: Option<String>,
}

/// Query string of `GET /api/data/all`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one series.
    pub key: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Run a store operation off the async runtime.
async fn with_storage<T, F>(state: &AppState, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Storage) -> Result<T> + Send + 'static,
{
    let storage = Arc::clone(&state.storage);
    tokio::task::spawn_blocking(move || op(&storage))
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
}

/// `GET /`: the chart page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "trendstore",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/report`: validate and append one sample.
pub async fn report(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReportResponse>)> {
    let sample = ReportRequest::from_body(&body)?.validate()?;
    let stored = with_storage(&state, move |storage| storage.append(&sample)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            status: "ok",
            id: stored.id,
        }),
    ))
}

/// `GET /api/keys`: distinct keys, unordered.
pub async fn keys(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let keys = with_storage(&state, Storage::list_keys).await?;
    Ok(Json(keys))
}

/// `GET /api/data`: the most recent window as chart points, oldest first.
pub async fn recent_data(
    State(state): State<AppState>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Result<Json<Vec<ChartPoint>>> {
    let query = query_params(query)?;
    let limit = Limit::parse(query.limit.as_deref())?;
    let points = with_storage(&state, move |storage| {
        storage.recent_window(query.key.as_deref(), limit)
    })
    .await?;
    Ok(Json(points))
}

/// `GET /api/data/all`: full history as records, oldest first.
pub async fn all_data(
    State(state): State<AppState>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<Sample>>> {
    let query = query_params(query)?;
    let samples =
        with_storage(&state, move |storage| storage.full_history(query.key.as_deref())).await?;
    Ok(Json(samples))
}
