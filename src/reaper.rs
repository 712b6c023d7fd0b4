//! Workspace reclamation
//!
//! [`reclaim`] removes a workspace tree right away. [`ReapGuard`] defers
//! the same removal to whenever the guard is dropped, which is how a
//! streamed response cleans up after its last byte (or after the client
//! disconnects).
//!
//! Both tolerate a workspace that is already gone. Removal failures are
//! logged and swallowed so they never replace a job's real outcome.

use crate::workspace::JobWorkspace;
use std::path::Path;

/// Remove the workspace tree now
pub async fn reclaim(workspace: &JobWorkspace) {
    match tokio::fs::remove_dir_all(&workspace.path).await {
        Ok(()) => {
            tracing::debug!(
                job_id = %workspace.job_id,
                workspace = ?workspace.path,
                "workspace reclaimed"
            );
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                job_id = %workspace.job_id,
                workspace = ?workspace.path,
                error = %e,
                "failed to reclaim workspace"
            );
        }
    }
}

fn reclaim_blocking(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => tracing::debug!(workspace = ?path, "workspace reclaimed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(workspace = ?path, error = %e, "failed to reclaim workspace"),
    }
}

/// Reclaims its workspace exactly once: on [`ReapGuard::reclaim_now`] or on drop
#[derive(Debug)]
pub struct ReapGuard {
    workspace: Option<JobWorkspace>,
}

impl ReapGuard {
    /// Take responsibility for reclaiming `workspace`
    pub fn new(workspace: JobWorkspace) -> Self {
        Self {
            workspace: Some(workspace),
        }
    }

    /// The guarded workspace
    pub fn workspace(&self) -> Option<&JobWorkspace> {
        self.workspace.as_ref()
    }

    /// Reclaim synchronously from the caller's point of view and disarm the guard
    pub async fn reclaim_now(mut self) {
        if let Some(workspace) = self.workspace.take() {
            reclaim(&workspace).await;
        }
    }
}

impl Drop for ReapGuard {
    fn drop(&mut self) {
        let Some(workspace) = self.workspace.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || reclaim_blocking(&workspace.path));
            }
            Err(_) => reclaim_blocking(&workspace.path),
        }
    }
}
