//! Tidal catalogue search (bearer token)

use super::{Candidate, SearchProvider};
use crate::credentials::Credential;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Searches `GET {api_base}/search/tracks?query=…&limit=…&countryCode=…`
pub struct TidalSearch {
    client: reqwest::Client,
    api_base: String,
    country_code: String,
}

impl TidalSearch {
    /// Create a search client against the given API base
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            country_code: country_code.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: u64,
    title: String,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    artists: Vec<Named>,
    artist: Option<Named>,
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
impl SearchProvider for TidalSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        credential: Option<&Credential>,
    ) -> Result<Vec<Candidate>> {
        let credential = credential
            .ok_or_else(|| Error::Authentication("Tidal search requires a session".into()))?;

        let response = self
            .client
            .get(format!("{}/search/tracks", self.api_base))
            .query(&[
                ("query", query),
                ("limit", &limit.to_string()),
                ("countryCode", &self.country_code),
            ])
            .bearer_auth(credential.expose())
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(Error::Authentication(format!(
                "Tidal rejected the access token ({})",
                response.status()
            )));
        }

        let page: SearchPage = response.error_for_status()?.json().await?;

        Ok(page
            .items
            .into_iter()
            .map(|t| {
                let artist = t
                    .artists
                    .into_iter()
                    .next()
                    .or(t.artist)
                    .map(|a| a.name)
                    .unwrap_or_default();
                Candidate {
                    id: t.id.to_string(),
                    title: t.title,
                    artist,
                    album: t.album.map(|a| a.title),
                    duration_secs: t.duration,
                }
            })
            .collect())
    }

    fn requires_session(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "tidal"
    }
}
