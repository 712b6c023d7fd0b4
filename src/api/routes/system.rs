//! System endpoints: health and OpenAPI.

use crate::api::AppState;
use crate::types::HealthReport;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - Provider session and configuration status
///
/// Besides the fields of [`HealthReport`] the body carries a
/// `<provider>_configured` flag (e.g. `deezer_configured`).
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service can serve requests", body = HealthReport),
        (status = 503, description = "Provider session is not valid", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let report = state.service.health().await;
    let status = if report.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        status = %report.status,
        session = ?report.session,
        "health check"
    );

    (status, Json(health_body(&report))).into_response()
}

fn health_body(report: &HealthReport) -> serde_json::Value {
    let mut body = json!({
        "status": report.status,
        "service": report.service,
        "provider": report.provider,
        "mode": report.mode,
        "configured": report.configured,
        "logged_in": report.logged_in,
        "session": report.session,
        "timestamp": report.timestamp,
    });
    body[format!("{}_configured", report.provider).as_str()] = json!(report.configured);
    body
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
