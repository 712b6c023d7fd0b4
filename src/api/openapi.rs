//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa and served at
//! `/openapi.json`; Swagger UI (when enabled) renders it at `/swagger-ui`.

use utoipa::OpenApi;

/// OpenAPI documentation for the trackfetch REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "trackfetch REST API",
        version = "0.1.0",
        description = "Resolve track queries and links to provider metadata, and stream audio fetched by an external downloader",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Tracks
        crate::api::routes::search_track,
        crate::api::routes::download_track,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Wire types from types.rs
        crate::types::TrackRequest,
        crate::types::SearchResponse,
        crate::types::HealthReport,
        crate::types::SessionState,
        crate::types::Quality,

        // Config types from config.rs
        crate::config::Config,
        crate::config::ServiceMode,
        crate::config::ApiConfig,
        crate::config::ProviderConfig,
        crate::config::ProviderKind,
        crate::config::AcquisitionConfig,
        crate::config::BackendKind,
        crate::config::DeadlineConfig,

        // Error types from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "tracks", description = "Track search and audio download"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` scheme to the document
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
