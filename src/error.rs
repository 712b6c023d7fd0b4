//! Error types for trackfetch
//!
//! This module provides the error taxonomy for the acquisition pipeline:
//! - Domain errors for each stage (resolve, launch, run, collect, clean up)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Resolution and launch errors keep their originating diagnostic in the
//! message so callers see the real cause rather than a generic failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for trackfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trackfetch
#[derive(Debug, Error)]
pub enum Error {
    /// No provider session could be established (missing or rejected secret)
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Search returned zero candidates, or the reference could not be parsed
    #[error("track not found: {0}")]
    SourceNotFound(String),

    /// The acquisition unit could not be started
    #[error("launch error: {0}")]
    Launch(String),

    /// The acquisition unit exited with an error
    #[error("acquisition failed (exit code {exit_code:?}): {diagnostic}")]
    RuntimeFailure {
        /// Process exit code, if the unit was a process that exited normally
        exit_code: Option<i32>,
        /// Captured diagnostic output (stderr tail or library error text)
        diagnostic: String,
    },

    /// A deadline was exceeded
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// What was being waited on (e.g. "search", "download")
        operation: String,
        /// The deadline that was exceeded
        after: Duration,
    },

    /// The unit reported success but no qualifying audio file materialized
    #[error("no audio file produced in {workspace}")]
    ArtifactMissing {
        /// Workspace that was scanned
        workspace: PathBuf,
    },

    /// Workspace allocation or credential materialization failed
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// The path being created, written or removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "acquisition.poll_interval")
        key: Option<String>,
    },

    /// The request body was malformed or incomplete
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The job was cancelled by the caller before reaching a terminal state
    #[error("job cancelled")]
    Cancelled,

    /// Network error talking to the provider
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider returned a payload we could not interpret
    #[error("provider error: {0}")]
    Provider(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Create a timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            after,
        }
    }
}

/// API error response format
///
/// Returned by API endpoints when an error occurs. The `success: false`
/// flag matches the shape of successful metadata responses so clients can
/// branch on a single field.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "success": false,
///   "error": "track not found: no results for 'Artist Title'",
///   "code": "not_found"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always false for error bodies
    pub success: bool,

    /// Human-readable error message, including the originating diagnostic
    pub error: String,

    /// Machine-readable error code (e.g., "not_found", "timeout")
    pub code: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidRequest(_) => 400,
            Error::Config { .. } => 400,

            // 404 Not Found - nothing to return
            Error::SourceNotFound(_) => 404,
            Error::ArtifactMissing { .. } => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Launch(_) => 500,
            Error::RuntimeFailure { .. } => 500,
            Error::Filesystem { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Cancelled => 500,

            // 502 Bad Gateway - Provider errors
            Error::Network(_) => 502,
            Error::Provider(_) => 502,

            // 503 Service Unavailable - no provider session
            Error::Authentication(_) => 503,

            // 504 Gateway Timeout
            Error::Timeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Authentication(_) => "authentication_error",
            Error::SourceNotFound(_) => "not_found",
            Error::Launch(_) => "launch_error",
            Error::RuntimeFailure { .. } => "runtime_failure",
            Error::Timeout { .. } => "timeout",
            Error::ArtifactMissing { .. } => "artifact_missing",
            Error::Filesystem { .. } => "filesystem_error",
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "validation_error",
            Error::Cancelled => "cancelled",
            Error::Network(_) => "network_error",
            Error::Provider(_) => "provider_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::RuntimeFailure { exit_code, .. } => Some(serde_json::json!({
                "exit_code": exit_code,
            })),
            Error::Timeout { operation, after } => Some(serde_json::json!({
                "operation": operation,
                "timeout_secs": after.as_secs(),
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            success: false,
            error: message,
            code,
            details,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Authentication("ARL rejected".into()),
                503,
                "authentication_error",
            ),
            (
                Error::SourceNotFound("no results".into()),
                404,
                "not_found",
            ),
            (Error::Launch("deemix not found".into()), 500, "launch_error"),
            (
                Error::RuntimeFailure {
                    exit_code: Some(2),
                    diagnostic: "bad url".into(),
                },
                500,
                "runtime_failure",
            ),
            (
                Error::timeout("download", Duration::from_secs(60)),
                504,
                "timeout",
            ),
            (
                Error::ArtifactMissing {
                    workspace: PathBuf::from("/tmp/ws"),
                },
                404,
                "artifact_missing",
            ),
            (
                Error::filesystem(
                    "/tmp/ws",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ),
                500,
                "filesystem_error",
            ),
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("acquisition.poll_interval".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::InvalidRequest("missing query".into()),
                400,
                "validation_error",
            ),
            (Error::Cancelled, 500, "cancelled"),
            (
                Error::Provider("unexpected payload".into()),
                502,
                "provider_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn runtime_failure_message_keeps_diagnostic() {
        let err = Error::RuntimeFailure {
            exit_code: Some(1),
            diagnostic: "Track not available in your country".into(),
        };
        let api: ApiError = err.into();

        assert!(!api.success);
        assert!(api.error.contains("Track not available in your country"));
        assert_eq!(api.details.unwrap()["exit_code"], 1);
    }

    #[test]
    fn timeout_details_carry_operation_and_seconds() {
        let api: ApiError = Error::timeout("search", Duration::from_secs(10)).into();

        assert_eq!(api.code, "timeout");
        assert!(api.error.contains("search timed out after 10s"));
        let details = api.details.unwrap();
        assert_eq!(details["operation"], "search");
        assert_eq!(details["timeout_secs"], 10);
    }

    #[test]
    fn filesystem_error_exposes_source() {
        let err = Error::filesystem(
            "/tmp/ws/config/.arl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/tmp/ws/config/.arl"));
    }

    #[test]
    fn not_found_serializes_with_success_false() {
        let api: ApiError = Error::SourceNotFound("no results for 'x'".into()).into();
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "not_found");
        assert!(json["error"].as_str().unwrap().contains("not found"));
        assert!(json.get("details").is_none());
    }
}
