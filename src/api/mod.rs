//! REST API server module
//!
//! Exposes the acquisition pipeline over HTTP: metadata search, audio
//! download, health, and the OpenAPI document.

use crate::{AcquisitionService, Result, config::ServiceMode};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router
///
/// # Routes
///
/// - `POST /search` - Resolve a query or link to track metadata
/// - `POST /download` - Fetch and stream the audio file (download mode only)
/// - `GET /health` - Provider session status
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive documentation (if enabled)
pub fn create_router(service: Arc<AcquisitionService>) -> Router {
    let state = AppState::new(service);
    let config = state.config.clone();

    let router = Router::new()
        .route("/search", post(routes::search_track))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = match config.mode {
        ServiceMode::Download => router.route("/download", post(routes::download_track)),
        ServiceMode::Search => router,
    };

    let router = if config.server.swagger_ui {
        router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    } else {
        router
    };

    let router = router.with_state(state);

    let router = if config.server.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.server.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    let router = router.layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        router.layer(build_cors_layer(&config.server.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve the API on the configured bind address until `shutdown` resolves.
///
/// # Example
///
/// ```no_run
/// use trackfetch::{AcquisitionService, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Arc::new(AcquisitionService::from_config(Config::from_env()?)?);
/// trackfetch::api::start_api_server(service, async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(service: Arc<AcquisitionService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = service.config().server.bind_address;

    tracing::info!(
        address = %bind_address,
        mode = service.config().mode.as_str(),
        provider = service.config().provider.kind.name(),
        "Starting API server"
    );

    let app = create_router(service);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
