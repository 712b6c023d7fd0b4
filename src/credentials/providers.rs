//! Authenticator implementations for the supported providers

use super::{Authenticator, Credential, Identity};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts any non-empty secret without contacting the provider.
///
/// Used for search-only instances where the secret is merely passed
/// through, and in tests.
pub struct StaticAuthenticator;

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn login(&self, credential: &Credential) -> Result<Option<Identity>> {
        if credential.expose().trim().is_empty() {
            return Err(Error::Authentication("empty secret".into()));
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Validates a Deezer ARL cookie against the web gateway's `getUserData` call
pub struct DeezerArlAuthenticator {
    client: reqwest::Client,
    gateway_url: String,
}

impl DeezerArlAuthenticator {
    /// Create an authenticator for the given gateway endpoint
    pub fn new(client: reqwest::Client, gateway_url: impl Into<String>) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
        }
    }
}

#[async_trait]
impl Authenticator for DeezerArlAuthenticator {
    async fn login(&self, credential: &Credential) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(&self.gateway_url)
            .query(&[
                ("method", "deezer.getUserData"),
                ("input", "3"),
                ("api_version", "1.0"),
                ("api_token", ""),
            ])
            .header(reqwest::header::COOKIE, format!("arl={}", credential.expose()))
            .timeout(LOGIN_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let user = &body["results"]["USER"];

        // USER_ID is numeric for real accounts and 0 for anonymous sessions
        let user_id = match &user["USER_ID"] {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => {
                return Err(Error::Provider(
                    "gateway response has no USER_ID".to_string(),
                ));
            }
        };
        if user_id.is_empty() || user_id == "0" {
            return Err(Error::Authentication("ARL was rejected by Deezer".into()));
        }

        Ok(Some(Identity {
            user_id,
            name: user["BLOG_NAME"].as_str().map(String::from),
        }))
    }

    fn name(&self) -> &'static str {
        "deezer-arl"
    }
}

/// Validates a Tidal access token against the sessions endpoint
pub struct TidalTokenAuthenticator {
    client: reqwest::Client,
    sessions_url: String,
}

impl TidalTokenAuthenticator {
    /// Create an authenticator for the given sessions endpoint
    pub fn new(client: reqwest::Client, sessions_url: impl Into<String>) -> Self {
        Self {
            client,
            sessions_url: sessions_url.into(),
        }
    }
}

#[async_trait]
impl Authenticator for TidalTokenAuthenticator {
    async fn login(&self, credential: &Credential) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(&self.sessions_url)
            .bearer_auth(credential.expose())
            .timeout(LOGIN_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::Authentication(
                    "Tidal access token was rejected".into(),
                ));
            }
            status if !status.is_success() => {
                return Err(Error::Provider(format!(
                    "Tidal sessions endpoint returned {status}"
                )));
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        let user_id = match &body["userId"] {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            _ => None,
        };

        Ok(user_id.map(|user_id| Identity {
            user_id,
            name: None,
        }))
    }

    fn name(&self) -> &'static str {
        "tidal-token"
    }
}
