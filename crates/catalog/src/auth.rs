//! Access-token acquisition and caching for the catalog API.
//!
//! `TokenCache` owns the only copy of the current token and hands it out via
//! [`TokenCache::get_valid`], refreshing through its [`Authorizer`] once the
//! token is within [`EXPIRY_MARGIN_SECS`] of expiring.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use tunewatch_common::traits::Clock;
use tunewatch_common::{Result, WatchError};

use crate::types::TokenResponse;

/// Default Spotify accounts endpoint.
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh this many seconds before the provider-reported expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of fresh access tokens.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Fails with `WatchError::Fetch`.
    async fn request_token(&self) -> Result<TokenResponse>;
}

/// How the application proves its identity to the accounts service.
#[derive(Debug, Clone)]
pub enum Grant {
    /// App-only access; works for public playlists.
    ClientCredentials,
    /// User access, needed for private or collaborative playlists.
    RefreshToken(String),
}

/// HTTP authorizer against the Spotify accounts service.
pub struct SpotifyAuthorizer {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    grant: Grant,
}

impl SpotifyAuthorizer {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        grant: Grant,
    ) -> Self {
        Self {
            http,
            token_url: TOKEN_URL.to_string(),
            client_id,
            client_secret,
            grant,
        }
    }

    /// Point at a different accounts endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl Authorizer for SpotifyAuthorizer {
    async fn request_token(&self) -> Result<TokenResponse> {
        let form: Vec<(&str, &str)> = match &self.grant {
            Grant::ClientCredentials => vec![("grant_type", "client_credentials")],
            Grant::RefreshToken(token) => {
                vec![("grant_type", "refresh_token"), ("refresh_token", token.as_str())]
            }
        };

        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| WatchError::Fetch(format!("token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WatchError::Fetch(format!(
                "token request rejected (status {}): {}",
                status.as_u16(),
                crate::excerpt(&body)
            )));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| WatchError::Fetch(format!("token response unreadable: {}", e)))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Owned, internally synchronized access-token cache.
pub struct TokenCache<A> {
    authorizer: A,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl<A: Authorizer> TokenCache<A> {
    pub fn new(authorizer: A, clock: Arc<dyn Clock>) -> Self {
        Self {
            authorizer,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Return a token that is valid for at least the expiry margin,
    /// refreshing it first if needed.
    pub async fn get_valid(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref() {
            if now + Duration::seconds(EXPIRY_MARGIN_SECS) < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let issued = self.authorizer.request_token().await?;
        let token = CachedToken {
            value: issued.access_token,
            expires_at: now + Duration::seconds(issued.expires_in.max(0)),
        };
        tracing::debug!(expires_at = %token.expires_at, "Catalog access token refreshed");

        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes (e.g. after a 401).
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
