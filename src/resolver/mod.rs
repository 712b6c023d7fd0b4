//! Source resolution: track link or free-text query → canonical reference
//!
//! Links matching the `…/track/<id>` shape are parsed locally with no
//! network traffic, provided their host belongs to the configured provider.
//! Anything else goes to the provider's search API, and the first-ranked
//! candidate wins.

use crate::config::{ProviderConfig, ProviderKind};
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::types::{ResolvedSource, SourceRef};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

mod deezer;
mod tidal;

pub use deezer::DeezerSearch;
pub use tidal::TidalSearch;

/// `scheme://host[:port]/[locale/][browse/]track/<id>[/][?query][#frag]`
#[allow(clippy::expect_used)]
static TRACK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)(?::\d+)?/(?:[a-z]{2}(?:-[a-z]{2})?/)?(?:browse/)?track/([A-Za-z0-9]+)/?(?:[?#].*)?$",
    )
    .expect("track link pattern is valid")
});

/// A track link split into its host and embedded id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackLink<'a> {
    /// Host name without port
    pub host: &'a str,
    /// Provider track id
    pub id: &'a str,
}

/// Split `input` into host and track id, if it has the track link shape
pub fn parse_track_link(input: &str) -> Option<TrackLink<'_>> {
    let caps = TRACK_LINK.captures(input.trim())?;
    Some(TrackLink {
        host: caps.get(1)?.as_str(),
        id: caps.get(2)?.as_str(),
    })
}

/// Hosts whose track links the configured provider can serve: its known
/// domains plus the host of the configured track-link base.
fn link_domains_for(config: &ProviderConfig) -> Vec<String> {
    let mut domains: Vec<String> = config
        .kind
        .link_domains()
        .iter()
        .map(|d| d.to_string())
        .collect();
    if let Some(TrackLink { host, .. }) = parse_track_link(&format!(
        "{}/0",
        config.track_url_base().trim_end_matches('/')
    )) {
        let host = host.to_ascii_lowercase();
        if !domains.contains(&host) {
            domains.push(host);
        }
    }
    domains
}

fn host_matches(host: &str, domains: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    domains.iter().any(|d| {
        host == *d
            || host
                .strip_suffix(d.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// One ranked search result as returned by a provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Provider track id
    pub id: String,
    /// Track title
    pub title: String,
    /// Primary artist name
    pub artist: String,
    /// Album title
    pub album: Option<String>,
    /// Duration in seconds
    pub duration_secs: u64,
}

/// Provider search API
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for tracks, highest-ranked first
    async fn search(
        &self,
        query: &str,
        limit: usize,
        credential: Option<&Credential>,
    ) -> Result<Vec<Candidate>>;

    /// Whether searches need an authenticated session
    fn requires_session(&self) -> bool {
        false
    }

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Build the search provider for a provider config
pub fn search_provider_for(
    config: &ProviderConfig,
    client: reqwest::Client,
) -> Arc<dyn SearchProvider> {
    match config.kind {
        ProviderKind::Deezer => Arc::new(DeezerSearch::new(client, config.api_base())),
        ProviderKind::Tidal => Arc::new(TidalSearch::new(
            client,
            config.api_base(),
            config.country_code.clone(),
        )),
    }
}

/// Turns raw request input into a [`ResolvedSource`]
pub struct SourceResolver {
    provider: Arc<dyn SearchProvider>,
    credentials: Arc<CredentialStore>,
    provider_kind: ProviderKind,
    link_domains: Vec<String>,
    track_url_base: String,
    search_timeout: Duration,
    search_limit: usize,
}

impl SourceResolver {
    /// Create a resolver
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        credentials: Arc<CredentialStore>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            provider,
            credentials,
            provider_kind: config.kind,
            link_domains: link_domains_for(config),
            track_url_base: config.track_url_base().to_string(),
            search_timeout: config.search_timeout,
            search_limit: config.search_limit.max(1),
        }
    }

    /// Resolve `input` within `deadline`.
    ///
    /// The search call is bounded by the smaller of `deadline` and the
    /// configured search timeout.
    pub async fn resolve(&self, input: &str, deadline: Duration) -> Result<ResolvedSource> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidRequest("query or url is required".into()));
        }

        if let Some(link) = parse_track_link(input) {
            if !host_matches(link.host, &self.link_domains) {
                tracing::info!(
                    host = link.host,
                    provider = self.provider_kind.name(),
                    "rejected track link from another provider"
                );
                return Err(Error::InvalidRequest(format!(
                    "track link host '{}' does not belong to {}",
                    link.host,
                    self.provider_kind.name()
                )));
            }
            let reference = SourceRef::new(link.id, &self.track_url_base)?;
            tracing::info!(track_id = reference.id(), "resolved track link without search");
            return Ok(ResolvedSource {
                reference,
                title: String::new(),
                artist: String::new(),
                album: None,
                duration_secs: 0,
            });
        }

        let budget = deadline.min(self.search_timeout);
        let credential = if self.provider.requires_session() {
            Some(self.credentials.credential().await?)
        } else {
            None
        };

        tracing::info!(provider = self.provider.name(), query = %input, "searching");
        let candidates = match tokio::time::timeout(
            budget,
            self.provider
                .search(input, self.search_limit, credential.as_ref()),
        )
        .await
        {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(Error::Authentication(msg))) => {
                self.credentials.invalidate().await;
                return Err(Error::Authentication(msg));
            }
            Ok(Err(Error::Network(e))) if e.is_timeout() => {
                return Err(Error::timeout("search", budget));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::timeout("search", budget)),
        };

        let Some(first) = candidates.into_iter().next() else {
            tracing::info!(query = %input, "no search results");
            return Err(Error::SourceNotFound(format!("no results for '{input}'")));
        };

        let reference = SourceRef::new(&first.id, &self.track_url_base).map_err(|_| {
            Error::Provider(format!("provider returned unusable track id '{}'", first.id))
        })?;
        tracing::info!(
            track_id = reference.id(),
            artist = %first.artist,
            title = %first.title,
            "resolved search query"
        );

        Ok(ResolvedSource {
            reference,
            title: first.title,
            artist: first.artist,
            album: first.album.filter(|a| !a.is_empty()),
            duration_secs: first.duration_secs,
        })
    }
}
