//! Common helpers for trackfetch end-to-end tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use trackfetch::{AcquisitionService, BackendKind, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Gateway path mounted on the mock provider for ARL logins
pub const GATEWAY_PATH: &str = "/gateway";

/// A service wired to a mock provider and a scripted downloader
pub struct TestHarness {
    /// The service under test
    pub service: Arc<AcquisitionService>,
    /// Mock Deezer API (search and login gateway)
    pub provider: MockServer,
    /// Parent of every job workspace
    pub workspace_root: PathBuf,
    _dir: TempDir,
}

impl TestHarness {
    /// Build a harness whose downloader runs `script`
    pub async fn new(script: &str) -> Self {
        Self::with(script, |_| {}).await
    }

    /// Like [`TestHarness::new`], with a hook to adjust the config
    pub async fn with(script: &str, adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockServer::start().await;
        mount_provider(&provider).await;

        let tool = write_tool(dir.path(), script);
        let workspace_root = dir.path().join("jobs");

        let mut config = Config::default();
        config.provider.api_base = Some(provider.uri());
        config.provider.session_url = Some(format!("{}{GATEWAY_PATH}", provider.uri()));
        config.provider.secret = Some("test-arl".into());
        config.acquisition.backend = BackendKind::Deemix;
        config.acquisition.tool_path = Some(tool);
        config.acquisition.workspace_root = Some(workspace_root.clone());
        config.acquisition.poll_interval_ms = 50;
        config.acquisition.finalize_grace_ms = 200;
        config.acquisition.settle_ms = 500;
        adjust(&mut config);

        let service = Arc::new(AcquisitionService::from_config(config).unwrap());
        Self {
            service,
            provider,
            workspace_root,
            _dir: dir,
        }
    }

    /// Job workspaces that still exist
    pub fn live_workspaces(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.workspace_root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Wait up to two seconds for every workspace to disappear
    pub async fn assert_reclaimed(&self) {
        for _ in 0..100 {
            if self.live_workspaces().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("workspaces left behind: {:?}", self.live_workspaces());
    }
}

async fn mount_provider(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/track"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(GATEWAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": {"USER": {"USER_ID": 4242, "BLOG_NAME": "tester"}}
        })))
        .mount(server)
        .await;
}

/// Write an executable shell script standing in for the downloader
pub fn write_tool(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tool = dir.join("fake-deemix");
    std::fs::write(&tool, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
    tool
}
