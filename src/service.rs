//! Acquisition service: resolve → launch → await → stream → reclaim
//!
//! [`AcquisitionService`] owns one instance of every component and is
//! shared by all request handlers. The only mutable state it shares across
//! requests is the credential store.

use crate::config::{Config, ProviderKind, ServiceMode};
use crate::credentials::{
    Authenticator, CredentialStore, DeezerArlAuthenticator, TidalTokenAuthenticator,
};
use crate::error::{Error, Result};
use crate::launcher::{CliLauncher, Launcher};
use crate::reaper::ReapGuard;
use crate::resolver::{SearchProvider, SourceResolver, search_provider_for};
use crate::streamer;
use crate::types::{
    AcquisitionRequest, AcquisitionResult, HealthReport, Quality, ResolvedSource, SessionState,
    TrackRequest,
};
use crate::watcher::{AcquisitionJob, CompletionWatcher};
use crate::workspace::WorkspaceManager;
use axum::response::Response;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "trackfetch";

/// A completed acquisition whose workspace is still alive
///
/// Dropping it (or the response built from it) reclaims the workspace.
#[derive(Debug)]
pub struct Acquired {
    /// What was fetched
    pub source: ResolvedSource,
    /// The produced file
    pub result: AcquisitionResult,
    guard: ReapGuard,
}

impl Acquired {
    /// Stream the file; the workspace is reclaimed after the last byte
    pub async fn into_response(self) -> Result<Response> {
        streamer::stream_file(&self.result, &self.source, self.guard).await
    }
}

/// A launched job and its workspace guard while the watcher runs.
///
/// If the request future is dropped mid-watch (the client went away), the
/// unit is stopped and awaited on a spawned task before the workspace is
/// removed, so a dying process never writes into a directory being deleted.
struct InFlight {
    job: Option<AcquisitionJob>,
    guard: Option<ReapGuard>,
}

impl InFlight {
    async fn watch(
        &mut self,
        watcher: &CompletionWatcher,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionResult> {
        match self.job.as_mut() {
            Some(job) => watcher.watch(job, cancel).await,
            None => Err(Error::Cancelled),
        }
    }

    fn into_parts(mut self) -> Option<(AcquisitionJob, ReapGuard)> {
        Some((self.job.take()?, self.guard.take()?))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let (Some(job), Some(guard)) = (self.job.take(), self.guard.take()) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(stop_and_reclaim(job, guard));
            }
            // No runtime left: kill_on_drop and the guard's blocking removal
            Err(_) => {
                drop(job);
                drop(guard);
            }
        }
    }
}

async fn stop_and_reclaim(mut job: AcquisitionJob, guard: ReapGuard) {
    tracing::info!(
        job_id = %job.workspace.job_id,
        "request dropped while watching, stopping unit"
    );
    job.stop().await;
    drop(job);
    guard.reclaim_now().await;
}

/// The orchestration core shared by all HTTP handlers
pub struct AcquisitionService {
    config: Arc<Config>,
    credentials: Arc<CredentialStore>,
    resolver: SourceResolver,
    launcher: Arc<dyn Launcher>,
    workspaces: WorkspaceManager,
    watcher: CompletionWatcher,
    shutdown: CancellationToken,
}

impl AcquisitionService {
    /// Build the service with the real provider clients and CLI launcher
    pub fn from_config(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trackfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let authenticator: Arc<dyn Authenticator> = match config.provider.kind {
            ProviderKind::Deezer => Arc::new(DeezerArlAuthenticator::new(
                client.clone(),
                config.provider.session_url(),
            )),
            ProviderKind::Tidal => Arc::new(TidalTokenAuthenticator::new(
                client.clone(),
                config.provider.session_url(),
            )),
        };
        let credentials = Arc::new(CredentialStore::new(
            config.provider.secret.clone(),
            config.provider.kind.secret_env_var(),
            authenticator,
        ));
        let search = search_provider_for(&config.provider, client);
        let launcher: Arc<dyn Launcher> = Arc::new(CliLauncher::from_config(&config.acquisition));

        Ok(Self::new(config, credentials, search, launcher))
    }

    /// Build the service from explicit collaborators
    pub fn new(
        config: Config,
        credentials: Arc<CredentialStore>,
        search: Arc<dyn SearchProvider>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let resolver = SourceResolver::new(search, credentials.clone(), &config.provider);
        let workspaces = WorkspaceManager::new(config.acquisition.workspace_root());
        let watcher = CompletionWatcher::from_config(&config.acquisition);
        Self {
            config: Arc::new(config),
            credentials,
            resolver,
            launcher,
            workspaces,
            watcher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Token cancelled on shutdown; in-flight jobs stop waiting when it fires
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Validate a request body and derive quality and deadline
    pub fn request(&self, body: &TrackRequest) -> Result<AcquisitionRequest> {
        let input = body
            .input()
            .ok_or_else(|| Error::InvalidRequest("query or url is required".into()))?;
        let quality = match body.quality.as_deref().filter(|q| !q.trim().is_empty()) {
            Some(raw) => raw.parse::<Quality>()?,
            None => Quality::default(),
        };
        Ok(AcquisitionRequest {
            input: input.to_string(),
            quality,
            deadline: self.config.acquisition.deadline_for(quality, body.timeout),
        })
    }

    /// Resolve metadata only
    pub async fn search(&self, request: &AcquisitionRequest) -> Result<ResolvedSource> {
        self.resolver.resolve(&request.input, request.deadline).await
    }

    /// Resolve, launch and wait for the file.
    ///
    /// On success the workspace stays alive inside the returned
    /// [`Acquired`]. On every error path it is reclaimed before returning.
    pub async fn acquire(&self, request: &AcquisitionRequest) -> Result<Acquired> {
        let deadline = Instant::now() + request.deadline;

        let credential = self.credentials.credential().await?;
        let source = self.resolver.resolve(&request.input, request.deadline).await?;

        let workspace = self.workspaces.allocate().await?;
        let guard = ReapGuard::new(workspace.clone());

        let unit = match self
            .launcher
            .launch(&source, &workspace, request.quality, Some(&credential))
            .await
        {
            Ok(unit) => unit,
            Err(e) => {
                tracing::error!(
                    job_id = %workspace.job_id,
                    launcher = self.launcher.name(),
                    error = %e,
                    "failed to launch acquisition unit"
                );
                guard.reclaim_now().await;
                return Err(e);
            }
        };

        let job = AcquisitionJob::new(workspace, source, unit, deadline, request.deadline);
        let mut in_flight = InFlight {
            job: Some(job),
            guard: Some(guard),
        };
        let outcome = in_flight.watch(&self.watcher, &self.shutdown).await;
        let Some((mut job, guard)) = in_flight.into_parts() else {
            return Err(Error::Cancelled);
        };

        match outcome {
            Ok(result) => Ok(Acquired {
                source: job.source.clone(),
                result,
                guard,
            }),
            Err(e) => {
                // Stop the unit before its workspace disappears under it
                job.stop().await;
                drop(job);
                guard.reclaim_now().await;
                Err(e)
            }
        }
    }

    /// Snapshot of configuration and session state.
    ///
    /// In download mode an invalid session triggers one login attempt.
    pub async fn health(&self) -> HealthReport {
        let configured = self.credentials.is_configured();
        let session = match self.config.mode {
            ServiceMode::Download => self.credentials.probe().await,
            ServiceMode::Search => self.credentials.state().await,
        };
        let healthy = match self.config.mode {
            ServiceMode::Download => session == SessionState::Valid,
            ServiceMode::Search => true,
        };

        HealthReport {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            service: SERVICE_NAME.to_string(),
            provider: self.config.provider.kind.name().to_string(),
            mode: self.config.mode.as_str().to_string(),
            configured,
            logged_in: session == SessionState::Valid,
            session,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Cancel in-flight jobs
    pub fn shutdown(&self) {
        tracing::info!("cancelling in-flight acquisitions");
        self.shutdown.cancel();
    }
}
