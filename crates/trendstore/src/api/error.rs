//! HTTP mapping for trendstore errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::error::Error;

impl Error {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_client_error() {
            debug!("Rejected request: {self}");
            self.to_string()
        } else {
            error!("Request failed: {self:?}");
            "internal server error".to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_response() {
        let response = Error::InvalidValue.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "value must be a number"})
        );
    }

    #[tokio::test]
    async fn test_storage_error_response_hides_details() {
        let response = Error::DatabaseMigration {
            message: "disk on fire".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "internal server error"})
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NoData.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::invalid_parameter("limit", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
