//! Deezer public search API

use super::{Candidate, SearchProvider};
use crate::credentials::Credential;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Searches `GET {api_base}/search/track?q=…&limit=…` (no authentication)
pub struct DeezerSearch {
    client: reqwest::Client,
    api_base: String,
}

impl DeezerSearch {
    /// Create a search client against the given API base
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Track>,
    error: Option<ApiFailure>,
}

#[derive(Debug, Deserialize)]
struct ApiFailure {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: u64,
    title: String,
    #[serde(default)]
    duration: u64,
    artist: Named,
    album: Option<Titled>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Titled {
    #[serde(default)]
    title: String,
}

#[async_trait]
impl SearchProvider for DeezerSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _credential: Option<&Credential>,
    ) -> Result<Vec<Candidate>> {
        let url = format!("{}/search/track", self.api_base);
        let page: SearchPage = self
            .client
            .get(&url)
            .query(&[("q", query), ("limit", &limit.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The API reports quota and parameter errors in a 200 body
        if let Some(failure) = page.error {
            return Err(Error::Provider(format!(
                "Deezer search failed ({}): {}",
                failure.kind, failure.message
            )));
        }

        Ok(page
            .data
            .into_iter()
            .map(|t| Candidate {
                id: t.id.to_string(),
                title: t.title,
                artist: t.artist.name,
                album: t.album.map(|a| a.title),
                duration_secs: t.duration,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "deezer"
    }
}
