//! Completion watcher
//!
//! Decides when an acquisition job is done by racing two signals: the unit
//! exiting, and a qualifying audio file showing up in the workspace. Some
//! tools keep running (or never exit cleanly) after the file is written,
//! so a finished file counts as completion on its own once it has settled:
//! its size and mtime must hold across consecutive polls for the settle
//! window. Tools that write straight into the final name look exactly like
//! a finished file while they download, and a file that is still changing
//! never stops its unit. A clean exit without a file does not complete:
//! the watcher keeps polling until the deadline.
//!
//! ```text
//! Launched ──► Running ──┬──► Completed
//!                        ├──► Failed
//!                        └──► TimedOut
//! ```

use crate::config::AcquisitionConfig;
use crate::error::{Error, Result};
use crate::launcher::{AcquisitionUnit, UnitExit};
use crate::streamer::media_type_for;
use crate::types::{AcquisitionResult, JobState, ResolvedSource};
use crate::workspace::JobWorkspace;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One in-flight acquisition: its workspace, its unit and its deadline
#[derive(Debug)]
pub struct AcquisitionJob {
    /// Workspace the unit writes into
    pub workspace: JobWorkspace,
    /// What is being fetched
    pub source: ResolvedSource,
    unit: AcquisitionUnit,
    deadline: Instant,
    budget: Duration,
    state: JobState,
}

impl AcquisitionJob {
    /// Create a job in the `Launched` state.
    ///
    /// `deadline` is the absolute instant the job must finish by; `budget`
    /// is the total time the request was granted, reported on timeout.
    pub fn new(
        workspace: JobWorkspace,
        source: ResolvedSource,
        unit: AcquisitionUnit,
        deadline: Instant,
        budget: Duration,
    ) -> Self {
        Self {
            workspace,
            source,
            unit,
            deadline,
            budget,
            state: JobState::Launched,
        }
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Force-stop the unit and wait (bounded) for it to exit
    pub async fn stop(&mut self) {
        self.unit.terminate().await;
    }

    /// Apply a transition. Returns false (and leaves the state alone) for
    /// transitions out of a terminal state or back to a non-terminal one.
    fn transition(&mut self, next: JobState) -> bool {
        let allowed = match (self.state, next) {
            (from, _) if from.is_terminal() => false,
            (JobState::Launched, JobState::Running) => true,
            (_, to) => to.is_terminal(),
        };
        if allowed {
            tracing::debug!(
                job_id = %self.workspace.job_id,
                from = ?self.state,
                to = ?next,
                "job state transition"
            );
            self.state = next;
        } else {
            tracing::warn!(
                job_id = %self.workspace.job_id,
                from = ?self.state,
                to = ?next,
                "rejected job state transition"
            );
        }
        allowed
    }
}

/// Finds finished audio files in a workspace
#[derive(Clone, Debug)]
pub struct ArtifactScanner {
    extensions: Vec<String>,
    partial_markers: Vec<String>,
}

impl ArtifactScanner {
    /// Create a scanner. Extensions are matched case-insensitively, with or
    /// without a leading dot.
    pub fn new<E, M>(extensions: E, partial_markers: M) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            partial_markers: partial_markers
                .into_iter()
                .map(|m| m.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Scanner using the configured extensions and partial markers
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(&config.audio_extensions, &config.partial_markers)
    }

    /// Whether a file name looks like a finished audio file.
    ///
    /// Hidden files and names carrying an in-progress marker never qualify.
    pub fn qualifies(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_ascii_lowercase(),
            None => return false,
        };
        if name.starts_with('.') {
            return false;
        }
        if self.partial_markers.iter().any(|m| name.contains(m.as_str())) {
            return false;
        }
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|a| *a == ext))
    }

    /// First qualifying, non-empty file under `root`, in directory listing order
    pub async fn find_first(&self, root: &Path) -> std::io::Result<Option<AcquisitionResult>> {
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // Subdirectories can vanish while a tool reorganizes its output
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && self.qualifies(&path) {
                    let size = match entry.metadata().await {
                        Ok(meta) => meta.len(),
                        Err(_) => continue,
                    };
                    if size == 0 {
                        continue;
                    }
                    let media_type = media_type_for(&path);
                    return Ok(Some(AcquisitionResult {
                        path,
                        media_type,
                        size,
                    }));
                }
            }
        }

        Ok(None)
    }
}

/// Polls in a row a file must look the same before it can count as finished
const MIN_UNCHANGED_POLLS: u32 = 2;

/// A qualifying file seen while its unit was still running
#[derive(Debug)]
struct Sighting {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
    since: Instant,
    unchanged_polls: u32,
}

impl Sighting {
    fn new(found: &AcquisitionResult, modified: Option<SystemTime>) -> Self {
        Self {
            path: found.path.clone(),
            size: found.size,
            modified,
            since: Instant::now(),
            unchanged_polls: 0,
        }
    }

    fn matches(&self, found: &AcquisitionResult, modified: Option<SystemTime>) -> bool {
        self.path == found.path && self.size == found.size && self.modified == modified
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Waits for an [`AcquisitionJob`] to reach a terminal state
#[derive(Clone, Debug)]
pub struct CompletionWatcher {
    poll_interval: Duration,
    finalize_grace: Duration,
    settle: Duration,
    scanner: ArtifactScanner,
}

impl CompletionWatcher {
    /// Create a watcher.
    ///
    /// `settle` is how long a file must stay unchanged while its unit is
    /// still running before the unit is given `finalize_grace` to exit and
    /// then stopped.
    pub fn new(
        poll_interval: Duration,
        finalize_grace: Duration,
        settle: Duration,
        scanner: ArtifactScanner,
    ) -> Self {
        Self {
            poll_interval,
            finalize_grace,
            settle,
            scanner,
        }
    }

    /// Watcher tuned from the acquisition config
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            config.poll_interval(),
            config.finalize_grace(),
            config.settle(),
            ArtifactScanner::from_config(config),
        )
    }

    /// Drive `job` to a terminal state.
    ///
    /// Returns the produced file on `Completed`. On `TimedOut` and on
    /// cancellation the unit is terminated before returning. The caller
    /// owns workspace cleanup on every path.
    pub async fn watch(
        &self,
        job: &mut AcquisitionJob,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionResult> {
        job.transition(JobState::Running);
        let job_id = job.workspace.job_id;

        let deadline = tokio::time::sleep_until(job.deadline);
        tokio::pin!(deadline);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut exited = false;
        let mut sighting: Option<Sighting> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %job_id, "job cancelled");
                    job.unit.terminate().await;
                    job.transition(JobState::Failed);
                    return Err(Error::Cancelled);
                }

                _ = &mut deadline => {
                    if exited {
                        tracing::error!(
                            job_id = %job_id,
                            workspace = ?job.workspace.path,
                            "unit exited successfully but produced no audio file"
                        );
                        job.transition(JobState::Failed);
                        return Err(Error::ArtifactMissing {
                            workspace: job.workspace.path.clone(),
                        });
                    }
                    tracing::error!(
                        job_id = %job_id,
                        budget_secs = job.budget.as_secs(),
                        "job deadline exceeded, terminating unit"
                    );
                    job.unit.terminate().await;
                    job.transition(JobState::TimedOut);
                    return Err(Error::timeout("download", job.budget));
                }

                exit = job.unit.wait(), if !exited => {
                    exited = true;
                    match exit {
                        UnitExit::Success => {
                            if let Some(result) = self.scan(job).await {
                                return Ok(complete(job, result));
                            }
                            tracing::warn!(
                                job_id = %job_id,
                                "unit exited successfully without an audio file, polling until deadline"
                            );
                        }
                        UnitExit::Failure { exit_code, diagnostic } => {
                            tracing::error!(
                                job_id = %job_id,
                                exit_code = ?exit_code,
                                diagnostic = %diagnostic,
                                "acquisition unit failed"
                            );
                            job.transition(JobState::Failed);
                            return Err(Error::RuntimeFailure { exit_code, diagnostic });
                        }
                    }
                }

                _ = interval.tick() => {
                    let Some(found) = self.scan(job).await else {
                        sighting = None;
                        continue;
                    };
                    if exited {
                        return Ok(complete(job, found));
                    }

                    let modified = modified_at(&found.path).await;
                    let unchanged = sighting
                        .as_ref()
                        .is_some_and(|seen| seen.matches(&found, modified));
                    if !unchanged {
                        tracing::debug!(
                            job_id = %job_id,
                            path = ?found.path,
                            size = found.size,
                            "audio file changing while unit is still running"
                        );
                        sighting = Some(Sighting::new(&found, modified));
                        continue;
                    }

                    let Some(seen) = sighting.as_mut() else {
                        continue;
                    };
                    seen.unchanged_polls += 1;
                    if seen.unchanged_polls < MIN_UNCHANGED_POLLS
                        || seen.since.elapsed() < self.settle
                    {
                        continue;
                    }

                    let Some(seen) = sighting.take() else {
                        continue;
                    };
                    if !self.finalize(job, &seen).await {
                        continue;
                    }
                    exited = true;

                    // The tool may have renamed or replaced the file while finishing
                    if let Some(result) = self.scan(job).await {
                        return Ok(complete(job, result));
                    }
                }
            }
        }
    }

    async fn scan(&self, job: &AcquisitionJob) -> Option<AcquisitionResult> {
        match self.scanner.find_first(&job.workspace.path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(
                    job_id = %job.workspace.job_id,
                    error = %e,
                    "workspace scan failed, will retry"
                );
                None
            }
        }
    }

    /// Give a still-running unit a short grace period to exit on its own,
    /// then stop it if its file has still not moved.
    ///
    /// Returns false when the file changed during the grace period; the
    /// unit is left running and the file has to settle again.
    async fn finalize(&self, job: &mut AcquisitionJob, seen: &Sighting) -> bool {
        let remaining = job.deadline.saturating_duration_since(Instant::now());
        let grace = self.finalize_grace.min(remaining);
        match tokio::time::timeout(grace, job.unit.wait()).await {
            Ok(UnitExit::Success) => true,
            Ok(UnitExit::Failure { exit_code, diagnostic }) => {
                tracing::warn!(
                    job_id = %job.workspace.job_id,
                    exit_code = ?exit_code,
                    diagnostic = %diagnostic,
                    "unit reported failure after writing its file"
                );
                true
            }
            Err(_) => {
                let still = match self.scan(job).await {
                    Some(found) => seen.matches(&found, modified_at(&found.path).await),
                    None => false,
                };
                if !still {
                    tracing::debug!(
                        job_id = %job.workspace.job_id,
                        path = ?seen.path,
                        "audio file changed during grace period, leaving unit running"
                    );
                    return false;
                }
                tracing::debug!(
                    job_id = %job.workspace.job_id,
                    grace_ms = grace.as_millis() as u64,
                    settle_ms = self.settle.as_millis() as u64,
                    "unit still running after its file settled, terminating"
                );
                job.unit.terminate().await;
                true
            }
        }
    }
}

fn complete(job: &mut AcquisitionJob, result: AcquisitionResult) -> AcquisitionResult {
    job.transition(JobState::Completed);
    tracing::info!(
        job_id = %job.workspace.job_id,
        path = ?result.path,
        size = result.size,
        media_type = result.media_type,
        "acquisition completed"
    );
    result
}
