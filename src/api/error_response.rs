//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::info!(code = self.error_code(), error = %self, "request rejected");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors normally go through Error::into_response, which knows the status
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Malformed or non-JSON request bodies become `400 validation_error`
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = Error::SourceNotFound("no results for 'x'".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "not_found");
        assert!(json["error"].as_str().unwrap().contains("no results for 'x'"));
    }

    #[tokio::test]
    async fn test_timeout_response_carries_details() {
        let response = Error::timeout("download", Duration::from_secs(2)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let json = body_json(response).await;
        assert_eq!(json["code"], "timeout");
        assert_eq!(json["details"]["operation"], "download");
        assert_eq!(json["details"]["timeout_secs"], 2);
    }

    #[tokio::test]
    async fn test_runtime_failure_keeps_diagnostic() {
        let response = Error::RuntimeFailure {
            exit_code: Some(1),
            diagnostic: "Track not yet available".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "runtime_failure");
        assert_eq!(json["details"]["exit_code"], 1);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("Track not yet available")
        );
    }

    #[tokio::test]
    async fn test_authentication_is_service_unavailable() {
        let response = Error::Authentication("DEEZER_ARL is not set".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], "authentication_error");
    }

    #[tokio::test]
    async fn test_api_error_direct_response() {
        let response = ApiError::new("custom", "something broke").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "custom");
        assert!(json.get("details").is_none());
    }
}
