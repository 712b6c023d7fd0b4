//! Configuration types for trackfetch
//!
//! The configuration is a serde tree with defaults for every field, so an
//! empty JSON object is a valid config. [`Config::from_env`] loads an
//! optional JSON file and overlays environment variables on top.

use crate::error::{Error, Result};
use crate::types::Quality;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the acquisition service
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Whether the service only resolves metadata or also downloads
    #[serde(default)]
    pub mode: ServiceMode,

    /// HTTP server settings
    #[serde(default)]
    pub server: ApiConfig,

    /// Music provider (search + session) settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// External acquisition tool settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Service variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Metadata-only: `/search` answers, `/download` is still routed but
    /// health never degrades on session state
    Search,
    /// Full acquisition: health reflects the provider session
    #[default]
    Download,
}

impl ServiceMode {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Search => "search",
            ServiceMode::Download => "download",
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Supported music providers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deezer (public search API, ARL session cookie)
    #[default]
    Deezer,
    /// Tidal (bearer-token API)
    Tidal,
}

impl ProviderKind {
    /// Lowercase provider name, also used as the health flag prefix
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Deezer => "deezer",
            ProviderKind::Tidal => "tidal",
        }
    }

    /// Environment variable holding the provider secret
    pub fn secret_env_var(&self) -> &'static str {
        match self {
            ProviderKind::Deezer => "DEEZER_ARL",
            ProviderKind::Tidal => "TIDAL_TOKEN",
        }
    }

    /// Registrable domains whose track links belong to this provider.
    /// Subdomains (`www.`, `listen.`) match too.
    pub fn link_domains(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Deezer => &["deezer.com"],
            ProviderKind::Tidal => &["tidal.com"],
        }
    }

    fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::Deezer => "https://api.deezer.com",
            ProviderKind::Tidal => "https://api.tidal.com/v1",
        }
    }

    fn default_track_url_base(&self) -> &'static str {
        match self {
            ProviderKind::Deezer => "https://www.deezer.com/track",
            ProviderKind::Tidal => "https://tidal.com/browse/track",
        }
    }

    fn default_session_url(&self) -> &'static str {
        match self {
            ProviderKind::Deezer => "https://www.deezer.com/ajax/gw-light.php",
            ProviderKind::Tidal => "https://api.tidal.com/v1/sessions",
        }
    }
}

/// Provider configuration
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderConfig {
    /// Which provider to search and authenticate against
    #[serde(default)]
    pub kind: ProviderKind,

    /// Search API base URL (default depends on provider)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Base of canonical track links, the id is appended (default depends on provider)
    #[serde(default)]
    pub track_url_base: Option<String>,

    /// Session check / login endpoint (default depends on provider)
    #[serde(default)]
    pub session_url: Option<String>,

    /// Country code sent with Tidal searches (default: "US")
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Upper bound on a single search call (default: 10 seconds)
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub search_timeout: Duration,

    /// Number of candidates requested from the provider (default: 1)
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Provider secret (ARL or access token); never serialized
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
}

impl ProviderConfig {
    /// Effective search API base
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_base())
    }

    /// Effective canonical track-link base
    pub fn track_url_base(&self) -> &str {
        self.track_url_base
            .as_deref()
            .unwrap_or_else(|| self.kind.default_track_url_base())
    }

    /// Effective session endpoint
    pub fn session_url(&self) -> &str {
        self.session_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_session_url())
    }

    /// Whether a non-empty secret is configured
    pub fn has_secret(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_base: None,
            track_url_base: None,
            session_url: None,
            country_code: default_country_code(),
            search_timeout: default_search_timeout(),
            search_limit: default_search_limit(),
            secret: None,
        }
    }
}

// Manual Debug so the secret never reaches logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_base", &self.api_base)
            .field("track_url_base", &self.track_url_base)
            .field("session_url", &self.session_url)
            .field("country_code", &self.country_code)
            .field("search_timeout", &self.search_timeout)
            .field("search_limit", &self.search_limit)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// External acquisition tools
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// `deemix` CLI (Deezer)
    #[default]
    Deemix,
    /// `rip` CLI from streamrip (Deezer)
    Streamrip,
    /// `tidal-dl-ng` CLI (Tidal)
    TidalDlNg,
}

impl BackendKind {
    /// Executable name searched on PATH
    pub fn binary_name(&self) -> &'static str {
        match self {
            BackendKind::Deemix => "deemix",
            BackendKind::Streamrip => "rip",
            BackendKind::TidalDlNg => "tidal-dl-ng",
        }
    }

    /// Provider this backend authenticates against
    pub fn provider(&self) -> ProviderKind {
        match self {
            BackendKind::Deemix | BackendKind::Streamrip => ProviderKind::Deezer,
            BackendKind::TidalDlNg => ProviderKind::Tidal,
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deemix" => Ok(BackendKind::Deemix),
            "streamrip" | "rip" => Ok(BackendKind::Streamrip),
            "tidal-dl-ng" | "tidal" => Ok(BackendKind::TidalDlNg),
            other => Err(Error::Config {
                message: format!("unknown backend '{other}'"),
                key: Some("acquisition.backend".into()),
            }),
        }
    }
}

/// Default deadlines per quality tier, in seconds
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeadlineConfig {
    /// Low quality (default: 60)
    #[serde(default = "default_compressed_deadline")]
    pub low: u64,
    /// High quality (default: 60)
    #[serde(default = "default_compressed_deadline")]
    pub high: u64,
    /// Lossless (default: 180)
    #[serde(default = "default_lossless_deadline")]
    pub lossless: u64,
    /// High-resolution (default: 300)
    #[serde(default = "default_hires_deadline")]
    pub hires: u64,
}

impl DeadlineConfig {
    /// Default deadline for a quality tier
    pub fn for_quality(&self, quality: Quality) -> Duration {
        let secs = match quality {
            Quality::Low => self.low,
            Quality::High => self.high,
            Quality::Lossless => self.lossless,
            Quality::HiRes => self.hires,
        };
        Duration::from_secs(secs)
    }
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            low: default_compressed_deadline(),
            high: default_compressed_deadline(),
            lossless: default_lossless_deadline(),
            hires: default_hires_deadline(),
        }
    }
}

/// Acquisition configuration (tool, workspaces, watcher tuning)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AcquisitionConfig {
    /// Which external tool performs the download
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to the tool executable (searched on PATH if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub tool_path: Option<PathBuf>,

    /// Parent directory for per-job workspaces (default: <tmp>/trackfetch)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub workspace_root: Option<PathBuf>,

    /// Interval between workspace scans in milliseconds (default: 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-quality default deadlines
    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// Largest timeout a request may ask for, in seconds (default: 600)
    #[serde(default = "default_max_timeout")]
    pub max_timeout_secs: u64,

    /// How long a still-running unit may keep finalizing after its file
    /// appeared, in milliseconds, before it is terminated (default: 2000)
    #[serde(default = "default_finalize_grace_ms")]
    pub finalize_grace_ms: u64,

    /// How long an audio file must stay unchanged (same size and mtime)
    /// while its unit is still running before it is treated as finished,
    /// in milliseconds (default: 10000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Extensions counted as finished audio (lowercase, no dot)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    /// Name fragments marking an in-progress file (lowercase)
    #[serde(default = "default_partial_markers")]
    pub partial_markers: Vec<String>,

    /// How much trailing stderr to keep for diagnostics, in bytes (default: 4096)
    #[serde(default = "default_diagnostic_tail_bytes")]
    pub diagnostic_tail_bytes: usize,
}

impl AcquisitionConfig {
    /// Effective workspace root
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("trackfetch"))
    }

    /// Workspace poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Grace period for a unit to exit after its file appeared
    pub fn finalize_grace(&self) -> Duration {
        Duration::from_millis(self.finalize_grace_ms)
    }

    /// Quiet period a file must hold before a running unit is stopped
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Deadline for a request: the requested timeout clamped to the
    /// configured maximum, or the per-quality default
    pub fn deadline_for(&self, quality: Quality, requested_secs: Option<u64>) -> Duration {
        match requested_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs.min(self.max_timeout_secs)),
            _ => self.deadlines.for_quality(quality),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            tool_path: None,
            workspace_root: None,
            poll_interval_ms: default_poll_interval_ms(),
            deadlines: DeadlineConfig::default(),
            max_timeout_secs: default_max_timeout(),
            finalize_grace_ms: default_finalize_grace_ms(),
            settle_ms: default_settle_ms(),
            audio_extensions: default_audio_extensions(),
            partial_markers: default_partial_markers(),
            diagnostic_tail_bytes: default_diagnostic_tail_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// If `TRACKFETCH_CONFIG` names a JSON file it is loaded first; the
    /// remaining variables then override individual fields.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an injectable variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("TRACKFETCH_CONFIG") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| Error::filesystem(path.clone(), e))?;
                serde_json::from_str::<Config>(&raw)?
            }
            None => Config::default(),
        };

        if let Some(mode) = lookup("TRACKFETCH_MODE") {
            config.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "search" => ServiceMode::Search,
                "download" => ServiceMode::Download,
                other => {
                    return Err(Error::Config {
                        message: format!("unknown mode '{other}'"),
                        key: Some("mode".into()),
                    });
                }
            };
        }

        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.server.bind_address = addr.parse().map_err(|_| Error::Config {
                message: format!("invalid bind address '{addr}'"),
                key: Some("server.bind_address".into()),
            })?;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("invalid port '{port}'"),
                key: Some("server.bind_address".into()),
            })?;
            config.server.bind_address.set_port(port);
        }
        if let Some(key) = lookup("TRACKFETCH_API_KEY").filter(|k| !k.is_empty()) {
            config.server.api_key = Some(key);
        }

        if let Some(backend) = lookup("TRACKFETCH_BACKEND") {
            config.acquisition.backend = backend.parse()?;
            config.provider.kind = config.acquisition.backend.provider();
        }
        if let Some(root) = lookup("TRACKFETCH_WORKSPACE_ROOT") {
            config.acquisition.workspace_root = Some(PathBuf::from(root));
        }
        if let Some(tool) = lookup("TRACKFETCH_TOOL_PATH") {
            config.acquisition.tool_path = Some(PathBuf::from(tool));
        }

        if let Some(secret) = lookup(config.provider.kind.secret_env_var()) {
            config.provider.secret = Some(secret);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        let acq = &self.acquisition;
        if acq.poll_interval_ms == 0 {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".into(),
                key: Some("acquisition.poll_interval_ms".into()),
            });
        }
        let d = &acq.deadlines;
        if d.low == 0 || d.high == 0 || d.lossless == 0 || d.hires == 0 || acq.max_timeout_secs == 0
        {
            return Err(Error::Config {
                message: "deadlines must be greater than zero".into(),
                key: Some("acquisition.deadlines".into()),
            });
        }
        if acq.audio_extensions.is_empty() {
            return Err(Error::Config {
                message: "at least one audio extension is required".into(),
                key: Some("acquisition.audio_extensions".into()),
            });
        }
        if self.mode == ServiceMode::Download && acq.backend.provider() != self.provider.kind {
            return Err(Error::Config {
                message: format!(
                    "backend {} requires provider {}, configured provider is {}",
                    acq.backend.binary_name(),
                    acq.backend.provider().name(),
                    self.provider.kind.name()
                ),
                key: Some("acquisition.backend".into()),
            });
        }
        Ok(())
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_country_code() -> String {
    "US".into()
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_search_limit() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_compressed_deadline() -> u64 {
    60
}

fn default_lossless_deadline() -> u64 {
    180
}

fn default_hires_deadline() -> u64 {
    300 // 5 minutes
}

fn default_max_timeout() -> u64 {
    600
}

fn default_finalize_grace_ms() -> u64 {
    2000
}

fn default_settle_ms() -> u64 {
    10_000
}

fn default_diagnostic_tail_bytes() -> usize {
    4096
}

fn default_audio_extensions() -> Vec<String> {
    ["mp3", "flac", "m4a", "mp4", "aac", "opus", "ogg", "wav"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_partial_markers() -> Vec<String> {
    [".part", ".tmp", ".temp", ".partial", ".crdownload", ".download", ".ytdl"]
        .into_iter()
        .map(String::from)
        .collect()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_json_object_is_a_valid_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        config.validate().unwrap();
        assert_eq!(config.mode, ServiceMode::Download);
        assert_eq!(config.provider.kind, ProviderKind::Deezer);
        assert_eq!(config.acquisition.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.acquisition.settle(), Duration::from_secs(10));
        assert_eq!(config.provider.search_timeout, Duration::from_secs(10));
    }

    #[test]
    fn deadline_defaults_follow_quality_tier() {
        let acq = AcquisitionConfig::default();
        assert_eq!(acq.deadline_for(Quality::High, None), Duration::from_secs(60));
        assert_eq!(
            acq.deadline_for(Quality::Lossless, None),
            Duration::from_secs(180)
        );
        assert_eq!(acq.deadline_for(Quality::HiRes, None), Duration::from_secs(300));
    }

    #[test]
    fn requested_timeout_is_clamped_to_maximum() {
        let acq = AcquisitionConfig::default();
        assert_eq!(
            acq.deadline_for(Quality::Low, Some(5)),
            Duration::from_secs(5)
        );
        assert_eq!(
            acq.deadline_for(Quality::Low, Some(10_000)),
            Duration::from_secs(600)
        );
        // zero falls back to the tier default rather than an instant timeout
        assert_eq!(
            acq.deadline_for(Quality::Low, Some(0)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn env_overlay_sets_port_backend_and_secret() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9100"),
            ("TRACKFETCH_BACKEND", "tidal-dl-ng"),
            ("TIDAL_TOKEN", "tok"),
            ("DEEZER_ARL", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.server.bind_address.port(), 9100);
        assert_eq!(config.acquisition.backend, BackendKind::TidalDlNg);
        assert_eq!(config.provider.kind, ProviderKind::Tidal);
        assert_eq!(config.provider.secret.as_deref(), Some("tok"));
    }

    #[test]
    fn missing_secret_is_not_a_config_error() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert!(!config.provider.has_secret());
    }

    #[test]
    fn invalid_port_is_rejected_with_key() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("server.bind_address")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn backend_provider_mismatch_fails_validation() {
        let mut config = Config::default();
        config.acquisition.backend = BackendKind::TidalDlNg;
        assert!(config.validate().is_err());

        // search-only instances never launch a backend
        config.mode = ServiceMode::Search;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let mut config = Config::default();
        config.acquisition.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn secret_is_never_serialized_or_debug_printed() {
        let mut config = Config::default();
        config.provider.secret = Some("super-secret-arl".into());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret-arl"));
        assert!(!format!("{:?}", config).contains("super-secret-arl"));
    }

    #[test]
    fn config_file_is_loaded_before_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mode":"search","acquisition":{"poll_interval_ms":250}}"#,
        )
        .unwrap();

        let config = Config::from_lookup(lookup_from(&[
            ("TRACKFETCH_CONFIG", path.to_str().unwrap()),
            ("PORT", "8088"),
        ]))
        .unwrap();

        assert_eq!(config.mode, ServiceMode::Search);
        assert_eq!(config.acquisition.poll_interval_ms, 250);
        assert_eq!(config.server.bind_address.port(), 8088);
    }

    #[test]
    fn provider_defaults_depend_on_kind() {
        let tidal = ProviderConfig {
            kind: ProviderKind::Tidal,
            ..Default::default()
        };
        assert_eq!(tidal.track_url_base(), "https://tidal.com/browse/track");
        assert_eq!(tidal.kind.secret_env_var(), "TIDAL_TOKEN");

        let custom = ProviderConfig {
            api_base: Some("http://127.0.0.1:9999".into()),
            ..Default::default()
        };
        assert_eq!(custom.api_base(), "http://127.0.0.1:9999");
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_the_process_environment() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var("TRACKFETCH_TOOL_PATH", "/opt/tools/deemix") };
        let config = Config::from_env();
        unsafe { std::env::remove_var("TRACKFETCH_TOOL_PATH") };

        assert_eq!(
            config.unwrap().acquisition.tool_path,
            Some(PathBuf::from("/opt/tools/deemix"))
        );
    }
}
