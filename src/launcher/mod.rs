//! Acquisition launcher
//!
//! A [`Launcher`] starts one acquisition unit for a job and returns its
//! handle without waiting for it. [`CliLauncher`] drives the supported
//! external tools (deemix, streamrip, tidal-dl-ng).

use crate::config::{AcquisitionConfig, BackendKind};
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::types::{Quality, ResolvedSource};
use crate::workspace::JobWorkspace;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

mod backends;
mod unit;

pub use unit::{AcquisitionUnit, ProcessUnit, UnitExit};

/// Starts acquisition units
///
/// Implementations must scope every file they write to the job workspace
/// and must not block beyond starting the unit.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start fetching `source` into `workspace`
    async fn launch(
        &self,
        source: &ResolvedSource,
        workspace: &JobWorkspace,
        quality: Quality,
        credential: Option<&Credential>,
    ) -> Result<AcquisitionUnit>;

    /// Get the name of this launcher
    fn name(&self) -> &'static str;
}

/// Launches an external command-line downloader
///
/// # Examples
///
/// ```no_run
/// use trackfetch::config::BackendKind;
/// use trackfetch::launcher::CliLauncher;
///
/// // Discover `deemix` on PATH at launch time
/// let launcher = CliLauncher::new(BackendKind::Deemix, None, 4096);
/// ```
pub struct CliLauncher {
    backend: BackendKind,
    tool_path: Option<PathBuf>,
    diagnostic_tail_bytes: usize,
}

impl CliLauncher {
    /// Create a launcher for `backend`.
    ///
    /// With `tool_path` unset the executable is looked up on PATH on every
    /// launch, so installing the tool does not require a restart.
    pub fn new(
        backend: BackendKind,
        tool_path: Option<PathBuf>,
        diagnostic_tail_bytes: usize,
    ) -> Self {
        Self {
            backend,
            tool_path,
            diagnostic_tail_bytes,
        }
    }

    /// Create a launcher from the acquisition config
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            config.backend,
            config.tool_path.clone(),
            config.diagnostic_tail_bytes,
        )
    }

    /// Locate the tool executable
    pub fn binary(&self) -> Result<PathBuf> {
        match &self.tool_path {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(Error::Launch(format!(
                "{} executable not found at {}",
                self.backend.binary_name(),
                path.display()
            ))),
            None => which::which(self.backend.binary_name()).map_err(|e| {
                Error::Launch(format!(
                    "{} executable not found on PATH: {e}",
                    self.backend.binary_name()
                ))
            }),
        }
    }
}

#[async_trait]
impl Launcher for CliLauncher {
    async fn launch(
        &self,
        source: &ResolvedSource,
        workspace: &JobWorkspace,
        quality: Quality,
        credential: Option<&Credential>,
    ) -> Result<AcquisitionUnit> {
        let credential = credential.ok_or_else(|| {
            Error::Launch(format!(
                "{} requires a provider credential",
                self.backend.binary_name()
            ))
        })?;
        let binary = self.binary()?;
        let invocation =
            backends::prepare(self.backend, source, workspace, quality, credential).await?;

        let child = Command::new(&binary)
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .current_dir(&invocation.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Launch(format!("failed to start {}: {e}", binary.display())))?;

        tracing::info!(
            job_id = %workspace.job_id,
            tool = self.backend.binary_name(),
            pid = ?child.id(),
            track_id = source.reference.id(),
            quality = %quality,
            "acquisition unit launched"
        );

        Ok(AcquisitionUnit::Process(ProcessUnit::new(
            child,
            self.diagnostic_tail_bytes,
        )))
    }

    fn name(&self) -> &'static str {
        self.backend.binary_name()
    }
}
