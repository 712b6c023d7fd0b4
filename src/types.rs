//! Core types for trackfetch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Unique identifier for an acquisition job (process-local, monotonic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requested audio quality, mapped by each backend onto its own vocabulary
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Compressed, low bitrate (128 kbps class)
    Low,
    /// Compressed, high bitrate (320 kbps class)
    High,
    /// CD-quality lossless (16-bit / 44.1 kHz)
    #[default]
    Lossless,
    /// High-resolution lossless (24-bit)
    HiRes,
}

impl Quality {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::High => "high",
            Quality::Lossless => "lossless",
            Quality::HiRes => "hires",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "128" => Ok(Quality::Low),
            "high" | "mp3" | "320" => Ok(Quality::High),
            "lossless" | "flac" | "cd" => Ok(Quality::Lossless),
            "hires" | "hi-res" | "hi_res" | "master" => Ok(Quality::HiRes),
            other => Err(Error::InvalidRequest(format!(
                "unknown quality '{other}' (expected low, high, lossless or hires)"
            ))),
        }
    }
}

/// Canonical reference to a provider track.
///
/// Only constructible from a validated id, so anything holding a
/// `SourceRef` can be placed into an argument vector as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    id: String,
    url: String,
}

impl SourceRef {
    /// Build a reference from a provider track id and the provider's track-link base.
    ///
    /// The id must be 1..=64 ASCII alphanumerics; anything else (including a
    /// leading `-` that a CLI could read as a flag) is rejected.
    pub fn new(id: &str, track_url_base: &str) -> Result<Self> {
        if id.is_empty() || id.len() > 64 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::SourceNotFound(format!(
                "invalid track reference '{id}'"
            )));
        }
        Ok(Self {
            id: id.to_string(),
            url: format!("{}/{}", track_url_base.trim_end_matches('/'), id),
        })
    }

    /// Provider track id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fully-qualified canonical link
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Output of the resolver: a canonical reference plus display metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedSource {
    /// Canonical reference, sufficient on its own to re-derive the track
    pub reference: SourceRef,
    /// Track title (empty when resolved from a link without a lookup)
    pub title: String,
    /// Primary artist name
    pub artist: String,
    /// Album title, when known
    pub album: Option<String>,
    /// Duration in seconds (0 when unknown)
    pub duration_secs: u64,
}

/// An immutable acquisition request, built at the HTTP boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionRequest {
    /// Raw input: a track link or a free-text query
    pub input: String,
    /// Requested quality
    pub quality: Quality,
    /// Total time budget for this request
    pub deadline: Duration,
}

/// Lifecycle state of an acquisition job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Unit handed to the watcher, not yet observed running
    Launched,
    /// Unit is running; watcher is polling
    Running,
    /// A qualifying audio file exists (terminal, positive)
    Completed,
    /// Unit failed or produced nothing (terminal, negative)
    Failed,
    /// Deadline exceeded (terminal, negative)
    TimedOut,
}

impl JobState {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut
        )
    }
}

/// A produced audio file ready to be streamed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionResult {
    /// File path inside the job workspace
    pub path: PathBuf,
    /// Media type inferred from the extension
    pub media_type: &'static str,
    /// File size in bytes
    pub size: u64,
}

impl AcquisitionResult {
    /// File name component, used for Content-Disposition
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track".to_string())
    }
}

/// Provider session state as tracked by the credential store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No secret configured, or no login attempted yet
    Absent,
    /// Last login succeeded
    Valid,
    /// Last login failed, or the session was rejected downstream
    Invalid,
}

/// Request body for `POST /search` and `POST /download`
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TrackRequest {
    /// Free-text search query ("Artist Title")
    #[serde(default)]
    pub query: Option<String>,
    /// Track link; takes precedence over `query` when both are set
    #[serde(default)]
    pub url: Option<String>,
    /// Requested quality (low, high, lossless, hires; aliases mp3, flac, master)
    #[serde(default)]
    pub quality: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl TrackRequest {
    /// The raw input string, preferring `url` over `query`.
    /// Blank fields count as absent.
    pub fn input(&self) -> Option<&str> {
        fn present(field: &Option<String>) -> Option<&str> {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        }
        present(&self.url).or_else(|| present(&self.query))
    }
}

/// Response body for a successful `POST /search`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// Always true
    pub success: bool,
    /// Canonical track link
    pub track_url: String,
    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album title (empty when unknown)
    pub album: String,
    /// Duration in seconds
    pub duration: u64,
    /// Provider track id
    pub track_id: String,
}

impl From<ResolvedSource> for SearchResponse {
    fn from(source: ResolvedSource) -> Self {
        Self {
            success: true,
            track_url: source.reference.url().to_string(),
            track_id: source.reference.id().to_string(),
            title: source.title,
            artist: source.artist,
            album: source.album.unwrap_or_default(),
            duration: source.duration_secs,
        }
    }
}

/// Snapshot of service health, rendered by `GET /health`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// "healthy" or "degraded"
    pub status: String,
    /// Service name
    pub service: String,
    /// Provider name (deezer, tidal)
    pub provider: String,
    /// Service mode (search, download)
    pub mode: String,
    /// Whether a provider secret is configured
    pub configured: bool,
    /// Whether the provider session is currently valid
    pub logged_in: bool,
    /// Current session state
    pub session: SessionState,
    /// Time of the report
    pub timestamp: DateTime<Utc>,
}
