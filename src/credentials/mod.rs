//! Provider credential store with single-flight session refresh
//!
//! The store is the only state shared across requests. Job code never
//! touches the session directly; it asks for a [`Credential`] through
//! [`CredentialStore::credential`], which establishes a session first if
//! needed.
//!
//! Concurrent callers that observe an invalid session while a login is in
//! flight wait for that login and share its outcome instead of starting
//! their own.

use crate::error::{Error, Result};
use crate::types::SessionState;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

mod providers;

pub use providers::{DeezerArlAuthenticator, StaticAuthenticator, TidalTokenAuthenticator};

/// Opaque provider secret (ARL cookie or access token)
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for handing to the acquisition unit or an auth header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Account identity reported by a successful login
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Provider user id
    pub user_id: String,
    /// Display name, when the provider returns one
    pub name: Option<String>,
}

/// Provider login protocol
///
/// Implementations verify a secret against the provider and report who it
/// belongs to. They are treated as opaque by the rest of the crate.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify the secret and return the account identity, if the provider exposes one
    async fn login(&self, credential: &Credential) -> Result<Option<Identity>>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    identity: Option<Identity>,
    /// Incremented on every completed login attempt
    generation: u64,
    last_error: Option<String>,
}

/// Process-wide provider session, injected into the resolver and launcher
pub struct CredentialStore {
    secret: Option<Credential>,
    secret_name: &'static str,
    authenticator: Arc<dyn Authenticator>,
    session: RwLock<Session>,
    login_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store for an optional secret.
    ///
    /// `secret_name` names the secret's source (e.g. `DEEZER_ARL`) in
    /// error messages. A blank secret is treated as absent.
    pub fn new(
        secret: Option<String>,
        secret_name: &'static str,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .map(Credential::new);
        Self {
            secret,
            secret_name,
            authenticator,
            session: RwLock::new(Session {
                state: SessionState::Absent,
                identity: None,
                generation: 0,
                last_error: None,
            }),
            login_lock: Mutex::new(()),
        }
    }

    /// Whether a secret is configured at all
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Current session state, without side effects
    pub async fn state(&self) -> SessionState {
        self.session.read().await.state
    }

    /// Ensure a valid session exists, logging in at most once per invalid observation.
    pub async fn ensure_session(&self) -> Result<Option<Identity>> {
        let observed = {
            let session = self.session.read().await;
            if session.state == SessionState::Valid {
                return Ok(session.identity.clone());
            }
            session.generation
        };

        let Some(secret) = &self.secret else {
            return Err(Error::Authentication(format!(
                "{} is not configured",
                self.secret_name
            )));
        };

        let _login = self.login_lock.lock().await;

        // Someone else finished a login while we waited for the lock
        {
            let session = self.session.read().await;
            if session.generation != observed {
                return match session.state {
                    SessionState::Valid => Ok(session.identity.clone()),
                    _ => Err(Error::Authentication(
                        session
                            .last_error
                            .clone()
                            .unwrap_or_else(|| "login failed".to_string()),
                    )),
                };
            }
        }

        tracing::debug!(authenticator = self.authenticator.name(), "logging in");
        let outcome = self.authenticator.login(secret).await;

        let mut session = self.session.write().await;
        session.generation += 1;
        match outcome {
            Ok(identity) => {
                tracing::info!(
                    authenticator = self.authenticator.name(),
                    user = ?identity.as_ref().map(|i| &i.user_id),
                    "provider session established"
                );
                session.state = SessionState::Valid;
                session.identity = identity.clone();
                session.last_error = None;
                Ok(identity)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    authenticator = self.authenticator.name(),
                    error = %message,
                    "provider login failed"
                );
                session.state = SessionState::Invalid;
                session.identity = None;
                session.last_error = Some(message.clone());
                Err(match e {
                    Error::Authentication(_) => e,
                    other => Error::Authentication(other.to_string()),
                })
            }
        }
    }

    /// Return the secret once a valid session is established
    pub async fn credential(&self) -> Result<Credential> {
        self.ensure_session().await?;
        self.secret
            .clone()
            .ok_or_else(|| Error::Authentication(format!("{} is not configured", self.secret_name)))
    }

    /// Mark the session invalid after a downstream rejection; the next
    /// `ensure_session` call logs in again
    pub async fn invalidate(&self) {
        let mut session = self.session.write().await;
        if session.state == SessionState::Valid {
            tracing::info!(
                authenticator = self.authenticator.name(),
                "provider session invalidated"
            );
        }
        session.state = SessionState::Invalid;
        session.identity = None;
    }

    /// Session state for health reporting.
    ///
    /// A valid session is reported as-is. Otherwise, if a secret is
    /// configured, one login is attempted opportunistically.
    pub async fn probe(&self) -> SessionState {
        let state = self.state().await;
        if state == SessionState::Valid || !self.is_configured() {
            return state;
        }
        match self.ensure_session().await {
            Ok(_) => SessionState::Valid,
            Err(e) => {
                tracing::debug!(error = %e, "health probe login failed");
                self.state().await
            }
        }
    }
}
