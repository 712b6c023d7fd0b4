//! Per-job workspace allocation
//!
//! Every acquisition job gets its own directory under the configured root.
//! Names combine a nanosecond UTC timestamp, a process-wide monotonic
//! counter and a random suffix, and the leaf directory is created with
//! `create_dir` (not `create_dir_all`) so an existing path is never reused.

use crate::error::{Error, Result};
use crate::reaper;
use crate::types::JobId;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Attempts before giving up on a colliding name
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// An isolated directory owned by exactly one job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobWorkspace {
    /// Job this workspace belongs to
    pub job_id: JobId,
    /// Workspace root directory
    pub path: PathBuf,
    /// When the directory was created
    pub created_at: DateTime<Utc>,
}

impl JobWorkspace {
    /// Directory the acquisition unit writes audio into
    pub fn output_dir(&self) -> PathBuf {
        self.path.join("out")
    }

    /// Directory for credential and settings files handed to the unit
    pub fn config_dir(&self) -> PathBuf {
        self.path.join(".config")
    }
}

/// Allocates and releases job workspaces
pub struct WorkspaceManager {
    root: PathBuf,
    next_job: AtomicU64,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root`; the root is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_job: AtomicU64::new(1),
        }
    }

    /// Root directory all workspaces live under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, uniquely named workspace
    pub async fn allocate(&self) -> Result<JobWorkspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::filesystem(&self.root, e))?;

        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let job_id = JobId(self.next_job.fetch_add(1, Ordering::Relaxed));
            let created_at = Utc::now();
            let suffix: u32 = rand::thread_rng().r#gen();
            let name = format!(
                "job-{}-{:06}-{:08x}",
                created_at.format("%Y%m%dT%H%M%S%.9f"),
                job_id.0,
                suffix
            );
            let path = self.root.join(name);

            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    restrict_permissions(&path).await;
                    let workspace = JobWorkspace {
                        job_id,
                        path,
                        created_at,
                    };
                    tokio::fs::create_dir(workspace.output_dir())
                        .await
                        .map_err(|e| Error::filesystem(workspace.output_dir(), e))?;
                    tracing::debug!(
                        job_id = %job_id,
                        workspace = ?workspace.path,
                        "allocated workspace"
                    );
                    return Ok(workspace);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::warn!(workspace = ?path, "workspace name collision, retrying");
                    continue;
                }
                Err(e) => return Err(Error::filesystem(path, e)),
            }
        }

        Err(Error::filesystem(
            &self.root,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "could not find an unused workspace name",
            ),
        ))
    }

    /// Remove a workspace; idempotent
    pub async fn release(&self, workspace: &JobWorkspace) {
        reaper::reclaim(workspace).await;
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) =
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await
    {
        tracing::warn!(workspace = ?path, error = %e, "failed to restrict workspace permissions");
    }
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) {}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn parallel_allocations_never_share_a_path() {
        let root = tempfile::tempdir().unwrap();
        let manager = Arc::new(WorkspaceManager::new(root.path().join("jobs")));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.allocate().await }));
        }

        let mut paths = HashSet::new();
        let mut ids = HashSet::new();
        for handle in handles {
            let ws = handle.await.unwrap().unwrap();
            assert!(ws.path.is_dir());
            assert!(ws.output_dir().is_dir());
            assert!(ids.insert(ws.job_id));
            assert!(paths.insert(ws.path));
        }
        assert_eq!(paths.len(), 64);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let ws = manager.allocate().await.unwrap();
        tokio::fs::write(ws.output_dir().join("a.flac"), b"x")
            .await
            .unwrap();

        manager.release(&ws).await;
        assert!(!ws.path.exists());
        manager.release(&ws).await;
        assert!(!ws.path.exists());
    }

    #[tokio::test]
    async fn name_carries_subsecond_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();

        let name = ws.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("job-"));
        // "YYYYMMDDTHHMMSS.nnnnnnnnn"
        let stamp = name.split('-').nth(1).unwrap();
        assert_eq!(stamp.split('.').nth(1).unwrap().len(), 9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn workspace_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(root.path()).allocate().await.unwrap();
        let mode = std::fs::metadata(&ws.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
