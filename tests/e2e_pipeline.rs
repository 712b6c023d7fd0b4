//! End-to-end acquisition through the HTTP router with scripted downloaders

#![cfg(unix)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tower::ServiceExt;
use trackfetch::api::create_router;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_query_is_searched_downloaded_and_streamed() {
    let harness = TestHarness::new(PRODUCES_FLAC).await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"query": "daft punk harder better", "quality": "flac", "timeout": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/flac");
    assert_eq!(headers[header::CONTENT_LENGTH], "18");
    assert_eq!(headers["x-track-artist"], "Daft Punk");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("Daft Punk - Harder.flac"), "{disposition}");
    assert!(!disposition.contains(".part"));

    // The job directory lives until the body is consumed
    assert_eq!(harness.live_workspaces().len(), 1);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"fLaC audio payload");

    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_link_skips_search() {
    let harness = TestHarness::new(PRODUCES_FLAC).await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/en/track/3135556?utm_source=share"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    let searches = harness
        .provider
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/search/track")
        .count();
    assert_eq!(searches, 0);
    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_tool_failure_returns_its_diagnostic() {
    let harness = TestHarness::new(FAILS).await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/track/1", "timeout": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "runtime_failure");
    assert_eq!(json["details"]["exit_code"], 1);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Track not yet available in your country")
    );
    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_hanging_tool_times_out_on_schedule() {
    let harness = TestHarness::new(HANGS).await;
    let app = create_router(harness.service.clone());

    let started = Instant::now();
    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/track/1", "timeout": 2}),
        ))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(body_json(response).await["code"], "timeout");

    // Reclaimed before the response was returned
    assert!(harness.live_workspaces().is_empty());
}

#[tokio::test]
async fn test_clean_exit_without_file_is_not_found() {
    let harness = TestHarness::new(PRODUCES_NOTHING).await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/track/1", "timeout": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "artifact_missing");
    assert!(harness.live_workspaces().is_empty());
}

#[tokio::test]
async fn test_lingering_tool_is_stopped_after_grace() {
    let harness = TestHarness::new(LINGERS).await;
    let app = create_router(harness.service.clone());

    let started = Instant::now();
    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/track/1", "quality": "mp3", "timeout": 20}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ID3 audio");
    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_slow_writer_is_streamed_in_full() {
    let harness = TestHarness::with(WRITES_IN_TWO_CHUNKS, |config| {
        config.acquisition.settle_ms = 5_000;
    })
    .await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.deezer.com/track/3135556", "timeout": 20}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "29");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"fLaC first chunk second chunk");
    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_client_disconnect_stops_tool_and_reclaims() {
    let harness = TestHarness::new(KEEPS_WRITING).await;
    let app = create_router(harness.service.clone());

    let request = app.oneshot(post_json(
        "/download",
        json!({"url": "https://www.deezer.com/track/1", "timeout": 30}),
    ));
    // the client gives up while the tool is still writing
    let outcome = tokio::time::timeout(Duration::from_millis(800), request).await;
    assert!(outcome.is_err());

    harness.assert_reclaimed().await;
    // nothing recreates the workspace once it is gone
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(harness.live_workspaces().is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_use_distinct_workspaces() {
    let harness = TestHarness::new(PRODUCES_FLAC).await;
    let app = create_router(harness.service.clone());

    let requests = (0..4).map(|_| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(post_json(
                    "/download",
                    json!({"url": "https://www.deezer.com/track/3135556", "timeout": 10}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap()
        }
    });
    for body in futures::future::join_all(requests).await {
        assert_eq!(&body[..], b"fLaC audio payload");
    }
    harness.assert_reclaimed().await;
}

#[tokio::test]
async fn test_health_logs_in_with_configured_secret() {
    let harness = TestHarness::new(HANGS).await;
    let app = create_router(harness.service.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["deezer_configured"], true);
    assert_eq!(json["logged_in"], true);
}

#[tokio::test]
async fn test_missing_secret_is_visible_in_health_and_blocks_download() {
    let harness = TestHarness::with(PRODUCES_FLAC, |config| config.provider.secret = None).await;
    let app = create_router(harness.service.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["deezer_configured"], false);

    let response = app
        .oneshot(post_json("/download", json!({"query": "daft punk"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(harness.live_workspaces().is_empty());
}
