//! Music playback collaborator.
//!
//! 1. Build the authorization-code URL and send the user to it
//! 2. Hand the returned code to the external token backend (`/auth`)
//! 3. Store the tokens against the user's identity
//! 4. Query and control playback with the access token, refreshing it
//!    through the backend (`/refresh`) when it expires
//!
//! Nothing here touches the session clock. Callers log failures and carry on.

mod backend;
mod client;

pub use backend::TokenBackend;
pub use client::{PlaybackClient, PlaybackState, Playlist, Track};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::identity::UserId;
use crate::storage::{Database, PlaybackConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub obtained_at: DateTime<Utc>,
}

/// Full authorization URL for the configured client.
///
/// # Errors
/// Returns [`PlaybackError::NotConfigured`] when no client id is set.
pub fn authorize_url(config: &PlaybackConfig) -> Result<url::Url, PlaybackError> {
    if config.client_id.trim().is_empty() {
        return Err(PlaybackError::NotConfigured(
            "playback.client_id is empty".into(),
        ));
    }
    let scopes = config.scopes.join(" ");
    Ok(url::Url::parse_with_params(
        &config.auth_url,
        [
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scopes.as_str()),
        ],
    )?)
}

/// Authorization code from what the user pasted back: either the full
/// redirect URL or the bare code.
///
/// # Errors
/// Returns [`PlaybackError::Denied`] when the redirect carries `error=`,
/// and [`PlaybackError::UnexpectedResponse`] when it carries no code.
pub fn code_from_redirect(redirect: &str) -> Result<String, PlaybackError> {
    let redirect = redirect.trim();
    let Ok(parsed) = url::Url::parse(redirect) else {
        if redirect.is_empty() {
            return Err(PlaybackError::UnexpectedResponse("empty authorization code".into()));
        }
        return Ok(redirect.to_string());
    };
    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    if let Some(reason) = param("error") {
        return Err(PlaybackError::Denied(reason));
    }
    param("code")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlaybackError::UnexpectedResponse("redirect URL has no code".into()))
}

/// Per-user token persistence in the local kv table.
pub struct TokenStore<'a> {
    db: &'a Database,
}

impl<'a> TokenStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn key(user: &UserId) -> String {
        format!("playback_tokens:{user}")
    }

    pub fn save(&self, user: &UserId, tokens: &PlaybackTokens) -> Result<(), PlaybackError> {
        let json = serde_json::to_string(tokens)
            .map_err(|e| PlaybackError::UnexpectedResponse(e.to_string()))?;
        self.db.kv_set(&Self::key(user), &json)?;
        Ok(())
    }

    pub fn load(&self, user: &UserId) -> Result<Option<PlaybackTokens>, PlaybackError> {
        match self.db.kv_get(&Self::key(user))? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(tokens) => Ok(Some(tokens)),
                Err(e) => {
                    tracing::warn!(user = %user, error = %e, "discarding unreadable playback tokens");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load) but missing tokens are an error.
    pub fn require(&self, user: &UserId) -> Result<PlaybackTokens, PlaybackError> {
        self.load(user)?.ok_or_else(|| PlaybackError::NotConnected {
            user: user.to_string(),
        })
    }

    pub fn clear(&self, user: &UserId) -> Result<(), PlaybackError> {
        self.db.kv_delete(&Self::key(user))?;
        Ok(())
    }
}
