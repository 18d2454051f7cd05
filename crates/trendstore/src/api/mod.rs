//! HTTP API for trendstore.
//!
//! Routes:
//! - `POST /api/report` appends a sample
//! - `GET /api/keys` lists distinct keys
//! - `GET /api/data` returns a recent window as chart points
//! - `GET /api/data/all` returns the full history
//! - `GET /` serves the chart page, `GET /health` a liveness probe

mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The trend store.
    pub storage: Arc<Storage>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state from an opened store and its configuration.
    #[must_use]
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }
}

/// Create the router with all routes.
pub fn router(state: AppState) -> Router {
    let cors_enabled = state.config.server.cors_enabled;

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/report", post(handlers::report))
        .route("/api/keys", get(handlers::keys))
        .route("/api/data", get(handlers::recent_data))
        .route("/api/data/all", get(handlers::all_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // CORS must be the outermost layer.
    if cors_enabled {
        app.layer(cors_layer())
    } else {
        app
    }
}

/// Permissive CORS: any origin, any header.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Bind to the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.bind_address();
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("trendstore listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("trendstore stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn test_app() -> Router {
        crate::logging::init_test_logging();
        let storage = Storage::open_in_memory().expect("failed to create test storage");
        router(AppState::new(storage, Config::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_raw(app: &Router, body: &'static str) -> (StatusCode, Value) {
        let request = Request::post("/api/report")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        send(app, request).await
    }

    async fn report(app: &Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/api/report")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    fn ys(body: &Value) -> Vec<f64> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|p| p["y"].as_f64().unwrap())
            .collect()
    }

    fn key_set(body: &Value) -> HashSet<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|k| k.as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_report_success() {
        let app = test_app();
        let (status, body) = report(&app, json!({"key": "test_key", "value": 100})).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "ok");
        assert!(body["id"].as_i64().is_some());
    }

    #[tokio::test]
    async fn test_report_ids_are_unique() {
        let app = test_app();
        let (_, first) = report(&app, json!({"key": "a", "value": 1})).await;
        let (_, second) = report(&app, json!({"key": "a", "value": 1})).await;

        assert_ne!(first["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_report_missing_key_persists_nothing() {
        let app = test_app();
        let (status, body) = report(&app, json!({"value": 5})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "key and value are required"}));

        let (_, keys) = get_json(&app, "/api/keys").await;
        assert_eq!(keys, json!([]));
    }

    #[tokio::test]
    async fn test_report_missing_value() {
        let app = test_app();
        let (status, body) = report(&app, json!({"key": "test_key"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "key and value are required"}));
    }

    #[tokio::test]
    async fn test_report_invalid_value_persists_nothing() {
        let app = test_app();
        let (status, body) = report(&app, json!({"key": "x", "value": "abc"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "value must be a number"}));

        let (_, history) = get_json(&app, "/api/data/all?key=x").await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn test_report_no_body() {
        let app = test_app();
        let (status, body) = post_raw(&app, "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No data provided"}));
    }

    #[tokio::test]
    async fn test_report_malformed_json() {
        let app = test_app();
        let (status, body) = post_raw(&app, "{\"key\": ").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No data provided"}));
    }

    #[tokio::test]
    async fn test_report_numeric_string_value() {
        let app = test_app();
        let (status, _) = report(&app, json!({"key": "s", "value": "12.5"})).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, data) = get_json(&app, "/api/data?key=s").await;
        assert_eq!(ys(&data), vec![12.5]);
    }

    #[tokio::test]
    async fn test_keys_empty() {
        let app = test_app();
        let (status, body) = get_json(&app, "/api/keys").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_keys_with_data() {
        let app = test_app();
        report(&app, json!({"key": "key1", "value": 10})).await;
        report(&app, json!({"key": "key2", "value": 20})).await;
        report(&app, json!({"key": "key1", "value": 30})).await;

        let (_, body) = get_json(&app, "/api/keys").await;
        let expected: HashSet<String> = ["key1", "key2"].iter().map(ToString::to_string).collect();
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(key_set(&body), expected);
    }

    #[tokio::test]
    async fn test_data_no_key() {
        let app = test_app();
        let (status, body) = get_json(&app, "/api/data").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_array());
    }

    #[tokio::test]
    async fn test_cpu_mem_scenario() {
        let app = test_app();
        report(&app, json!({"key": "cpu", "value": 10})).await;
        report(&app, json!({"key": "cpu", "value": 20})).await;
        report(&app, json!({"key": "mem", "value": 5})).await;

        let (_, keys) = get_json(&app, "/api/keys").await;
        assert_eq!(key_set(&keys).len(), 2);

        let (status, data) = get_json(&app, "/api/data?key=cpu").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ys(&data), vec![10.0, 20.0]);
        assert!(data[0]["x"].as_str().unwrap().len() == "YYYY-MM-DD HH:MM:SS".len());

        let (_, data) = get_json(&app, "/api/data?key=cpu&limit=1").await;
        assert_eq!(ys(&data), vec![20.0]);
    }

    #[tokio::test]
    async fn test_data_with_limit() {
        let app = test_app();
        for i in 0..10 {
            report(&app, json!({"key": "test", "value": i})).await;
        }

        let (_, data) = get_json(&app, "/api/data?key=test&limit=5").await;
        assert_eq!(ys(&data), vec![5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_data_rejects_non_positive_limit() {
        let app = test_app();
        report(&app, json!({"key": "test", "value": 1})).await;

        for uri in [
            "/api/data?key=test&limit=0",
            "/api/data?key=test&limit=-3",
            "/api/data?key=test&limit=abc",
        ] {
            let (status, body) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({"error": "limit must be a positive integer"}));
        }
    }

    #[tokio::test]
    async fn test_report_value_out_of_f64_range() {
        let app = test_app();
        let (status, body) = post_raw(&app, r#"{"key": "x", "value": 1e400}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "value must be a number"}));

        let (_, keys) = get_json(&app, "/api/keys").await;
        assert_eq!(keys, json!([]));
    }

    #[tokio::test]
    async fn test_report_falsy_key() {
        let app = test_app();
        let (status, body) = post_raw(&app, r#"{"key": false, "value": 1}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "key and value are required"}));
    }

    #[tokio::test]
    async fn test_duplicate_query_parameters_are_json_errors() {
        let app = test_app();

        for uri in ["/api/data?limit=5&limit=6", "/api/data/all?key=a&key=b"] {
            let (status, body) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let message = body["error"].as_str().unwrap_or_default();
            assert!(message.contains("duplicate field"), "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn test_data_wrong_key() {
        let app = test_app();
        report(&app, json!({"key": "test", "value": 10})).await;

        let (status, body) = get_json(&app, "/api/data?key=nonexistent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_all_data_with_key() {
        let app = test_app();
        report(&app, json!({"key": "test", "value": 10})).await;
        report(&app, json!({"key": "other", "value": 1})).await;

        let (status, body) = get_json(&app, "/api/data/all?key=test").await;
        assert_eq!(status, StatusCode::OK);

        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["key"], "test");
        assert_eq!(records[0]["value"], 10.0);
        assert!(records[0]["id"].as_i64().is_some());
        assert!(records[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_all_data_float_fidelity() {
        let app = test_app();
        report(&app, json!({"key": "pi", "value": 3.14})).await;

        let (_, body) = get_json(&app, "/api/data/all?key=pi").await;
        assert_eq!(body[0]["value"].as_f64(), Some(3.14));
    }

    #[tokio::test]
    async fn test_window_is_suffix_of_history() {
        let app = test_app();
        for i in 0..7 {
            report(&app, json!({"key": "s", "value": i})).await;
        }

        let (_, history) = get_json(&app, "/api/data/all?key=s").await;
        let (_, window) = get_json(&app, "/api/data?key=s&limit=3").await;

        let history_values: Vec<f64> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_f64().unwrap())
            .collect();
        assert_eq!(ys(&window), history_values[history_values.len() - 3..].to_vec());
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "trendstore");
    }

    #[tokio::test]
    async fn test_cors_headers_present() {
        let app = test_app();
        let request = Request::get("/api/keys")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_cors_disabled() {
        let mut config = Config::default();
        config.server.cors_enabled = false;
        let storage = Storage::open_in_memory().unwrap();
        let app = router(AppState::new(storage, config));

        let request = Request::get("/api/keys")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
