//! # trackfetch
//!
//! HTTP service that turns a track query or link into an audio file.
//!
//! A request is resolved against the provider's catalogue, an external
//! downloader (deemix, streamrip or tidal-dl-ng) is launched inside a
//! private per-job workspace, and the first finished audio file is
//! streamed back. The workspace is removed on every exit path: after the
//! last byte is sent, when the client disconnects, on failure, and on
//! timeout.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trackfetch::{AcquisitionService, Config, TrackRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let service = Arc::new(AcquisitionService::from_config(config)?);
//!
//!     let request = service.request(&TrackRequest {
//!         query: Some("Daft Punk Harder Better Faster Stronger".into()),
//!         ..Default::default()
//!     })?;
//!     let acquired = service.acquire(&request).await?;
//!     println!("fetched {}", acquired.result.path.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Provider session management
pub mod credentials;
/// Error types
pub mod error;
/// External downloader launch
pub mod launcher;
/// Workspace cleanup
pub mod reaper;
/// Query and link resolution
pub mod resolver;
/// Request orchestration
pub mod service;
/// Audio file streaming
pub mod streamer;
/// Core types
pub mod types;
/// Completion detection
pub mod watcher;
/// Per-job workspaces
pub mod workspace;

// Re-export commonly used types
pub use config::{BackendKind, Config, ProviderKind, ServiceMode};
pub use credentials::{Credential, CredentialStore};
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use launcher::{AcquisitionUnit, CliLauncher, Launcher};
pub use resolver::{SearchProvider, SourceResolver};
pub use service::{Acquired, AcquisitionService};
pub use types::{
    AcquisitionRequest, AcquisitionResult, HealthReport, JobId, JobState, Quality,
    ResolvedSource, SearchResponse, SessionState, SourceRef, TrackRequest,
};

/// Serve the API until a termination signal arrives.
///
/// On SIGTERM or SIGINT (Ctrl+C elsewhere) the server stops accepting
/// connections and in-flight acquisitions are cancelled, which kills their
/// downloaders and removes their workspaces.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use trackfetch::{AcquisitionService, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = AcquisitionService::from_config(Config::from_env()?)?;
///     run_with_shutdown(Arc::new(service)).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: std::sync::Arc<AcquisitionService>) -> Result<()> {
    let token = service.shutdown_token();
    let signal_service = service.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_service.shutdown();
    });

    api::start_api_server(service, async move { token.cancelled().await }).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
