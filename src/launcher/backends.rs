//! Per-backend invocation profiles
//!
//! Each profile turns a resolved source into an explicit argument vector
//! and writes whatever credential or settings files the tool needs into
//! the job workspace. Nothing is written outside the workspace: tools that
//! read from `$HOME` or `$XDG_CONFIG_HOME` get both pointed at it.

use crate::config::BackendKind;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::types::{Quality, ResolvedSource};
use crate::workspace::JobWorkspace;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Everything needed to spawn the tool for one job
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) args: Vec<OsString>,
    pub(crate) envs: Vec<(OsString, OsString)>,
    pub(crate) current_dir: PathBuf,
}

impl Invocation {
    fn new(workspace: &JobWorkspace) -> Self {
        Self {
            args: Vec::new(),
            envs: vec![
                ("HOME".into(), workspace.path.clone().into_os_string()),
                (
                    "XDG_CONFIG_HOME".into(),
                    workspace.config_dir().into_os_string(),
                ),
            ],
            current_dir: workspace.path.clone(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Backend-specific quality code
pub(crate) fn quality_code(backend: BackendKind, quality: Quality) -> &'static str {
    match (backend, quality) {
        (BackendKind::Deemix, Quality::Low) => "128",
        (BackendKind::Deemix, Quality::High) => "320",
        (BackendKind::Deemix, Quality::Lossless | Quality::HiRes) => "flac",
        (BackendKind::Streamrip, Quality::Low) => "0",
        (BackendKind::Streamrip, Quality::High) => "1",
        (BackendKind::Streamrip, Quality::Lossless) => "2",
        (BackendKind::Streamrip, Quality::HiRes) => "3",
        (BackendKind::TidalDlNg, Quality::Low) => "LOW",
        (BackendKind::TidalDlNg, Quality::High) => "HIGH",
        (BackendKind::TidalDlNg, Quality::Lossless) => "LOSSLESS",
        (BackendKind::TidalDlNg, Quality::HiRes) => "HI_RES_LOSSLESS",
    }
}

/// Materialize credentials and build the invocation for `backend`
pub(crate) async fn prepare(
    backend: BackendKind,
    source: &ResolvedSource,
    workspace: &JobWorkspace,
    quality: Quality,
    credential: &Credential,
) -> Result<Invocation> {
    let code = quality_code(backend, quality);
    let output = workspace.output_dir();
    let url = source.reference.url();

    match backend {
        BackendKind::Deemix => {
            // --portable makes deemix read ./config relative to the working directory
            write_private(&workspace.path.join("config").join(".arl"), credential.expose())
                .await?;
            Ok(Invocation::new(workspace)
                .arg("--portable")
                .arg("-b")
                .arg(code)
                .arg("-p")
                .arg(output)
                .arg(url))
        }
        BackendKind::Streamrip => {
            let config_path = workspace.path.join("streamrip.toml");
            write_private(
                &config_path,
                &streamrip_config(&output, code, credential.expose())?,
            )
            .await?;
            Ok(Invocation::new(workspace)
                .arg("--config-path")
                .arg(config_path)
                .arg("--folder")
                .arg(output)
                .arg("--quality")
                .arg(code)
                .arg("--no-db")
                .arg("url")
                .arg(url))
        }
        BackendKind::TidalDlNg => {
            let dir = workspace.config_dir().join("tidal-dl-ng");
            write_private(&dir.join("token.json"), &tidal_token(credential.expose())?).await?;
            write_private(&dir.join("settings.json"), &tidal_settings(&output, code)?).await?;
            Ok(Invocation::new(workspace).arg("dl").arg(url))
        }
    }
}

fn streamrip_config(output: &Path, quality: &str, arl: &str) -> Result<String> {
    // JSON string literals are valid TOML basic strings
    let folder = serde_json::to_string(&output.to_string_lossy())?;
    let arl = serde_json::to_string(arl)?;
    Ok(format!(
        "[downloads]\nfolder = {folder}\n\n\
         [deezer]\nquality = {quality}\narl = {arl}\nuse_deezloader = false\n\n\
         [database]\ndownloads_enabled = false\nfailed_downloads_enabled = false\n"
    ))
}

fn tidal_token(access_token: &str) -> Result<String> {
    let expiry = chrono::Utc::now() + chrono::Duration::days(1);
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "token_type": "Bearer",
        "access_token": access_token,
        "refresh_token": "",
        "expiry_time": expiry.timestamp() as f64,
    }))?)
}

fn tidal_settings(output: &Path, quality: &str) -> Result<String> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "download_base_path": output.to_string_lossy(),
        "quality_audio": quality,
        "skip_existing": false,
    }))?)
}

/// Write a file readable only by the owner, creating parent directories
async fn write_private(path: &Path, contents: &str) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::filesystem(parent, e))?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| Error::filesystem(path, e))?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| Error::filesystem(path, e))?;
    file.flush().await.map_err(|e| Error::filesystem(path, e))?;
    Ok(())
}
