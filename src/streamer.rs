//! Result streamer
//!
//! Turns a completed acquisition into an HTTP response whose body reads the
//! file in chunks. The body owns the job's [`ReapGuard`], so the workspace
//! is removed once the last chunk is sent or the client goes away.

use crate::error::{Error, Result};
use crate::reaper::ReapGuard;
use crate::types::{AcquisitionResult, ResolvedSource};
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::Response;
use futures::StreamExt;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Header carrying the resolved track title
pub const TRACK_TITLE_HEADER: &str = "x-track-title";
/// Header carrying the resolved artist name
pub const TRACK_ARTIST_HEADER: &str = "x-track-artist";

/// Media type for an audio file, by extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "opus" => "audio/opus",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` value keeping the original name.
///
/// `filename` gets an ASCII-only fallback; `filename*` carries the exact
/// name percent-encoded as UTF-8.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// Header values must be visible ASCII; anything else is percent-encoded
fn header_text(value: &str) -> Option<HeaderValue> {
    if value.is_empty() {
        return None;
    }
    if value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        HeaderValue::from_str(value).ok()
    } else {
        HeaderValue::from_str(&urlencoding::encode(value)).ok()
    }
}

/// Build a streaming response for `result`.
///
/// `guard` travels with the body; dropping the response at any point
/// (including before it is sent) reclaims the workspace.
pub async fn stream_file(
    result: &AcquisitionResult,
    source: &ResolvedSource,
    guard: ReapGuard,
) -> Result<Response> {
    let file = tokio::fs::File::open(&result.path)
        .await
        .map_err(|e| Error::filesystem(&result.path, e))?;

    // Size can still change between the scan and the open
    let size = file
        .metadata()
        .await
        .map(|m| m.len())
        .unwrap_or(result.size);

    let job_id = guard.workspace().map(|w| w.job_id);
    tracing::info!(
        job_id = ?job_id,
        path = ?result.path,
        size,
        media_type = result.media_type,
        "streaming audio file"
    );

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _held = &guard;
        chunk
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(result.media_type),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&result.file_name())) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(title) = header_text(&source.title) {
        headers.insert(HeaderName::from_static(TRACK_TITLE_HEADER), title);
    }
    if let Some(artist) = header_text(&source.artist) {
        headers.insert(HeaderName::from_static(TRACK_ARTIST_HEADER), artist);
    }

    Ok(response)
}
