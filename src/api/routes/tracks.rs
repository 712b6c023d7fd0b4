//! Track endpoints: metadata search and audio download.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{SearchResponse, TrackRequest};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};

/// POST /search - Resolve a query or link to track metadata
#[utoipa::path(
    post,
    path = "/search",
    tag = "tracks",
    request_body = TrackRequest,
    responses(
        (status = 200, description = "Track metadata", body = SearchResponse),
        (status = 400, description = "Missing input or unknown quality", body = ApiError),
        (status = 404, description = "No matching track", body = ApiError),
        (status = 502, description = "Provider unreachable", body = ApiError),
        (status = 504, description = "Search timed out", body = ApiError)
    )
)]
pub async fn search_track(
    State(state): State<AppState>,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, Error> {
    let Json(body) = body?;
    let request = state.service.request(&body)?;
    tracing::info!(input = %request.input, "search request");

    let source = state.service.search(&request).await?;
    Ok(Json(SearchResponse::from(source)))
}

/// POST /download - Fetch a track and stream the audio file
///
/// The workspace is removed once the body has been sent or the client
/// disconnects.
#[utoipa::path(
    post,
    path = "/download",
    tag = "tracks",
    request_body = TrackRequest,
    responses(
        (status = 200, description = "Audio bytes with Content-Disposition", content_type = "application/octet-stream"),
        (status = 400, description = "Missing input or unknown quality", body = ApiError),
        (status = 404, description = "No matching track, or no file produced", body = ApiError),
        (status = 500, description = "Downloader failed to start or exited with an error", body = ApiError),
        (status = 503, description = "No provider session", body = ApiError),
        (status = 504, description = "Download deadline exceeded", body = ApiError)
    )
)]
pub async fn download_track(
    State(state): State<AppState>,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(body) = body?;
    let request = state.service.request(&body)?;
    tracing::info!(
        input = %request.input,
        quality = %request.quality,
        deadline_secs = request.deadline.as_secs(),
        "download request"
    );

    let acquired = state.service.acquire(&request).await?;
    acquired.into_response().await
}
