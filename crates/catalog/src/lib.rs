pub mod auth;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use tunewatch_common::config::AppConfig;
use tunewatch_common::traits::{CatalogSource, Clock};
use tunewatch_common::types::PlaylistItem;
use tunewatch_common::{Result, WatchError};

pub use auth::{Authorizer, Grant, SpotifyAuthorizer, TokenCache};
use types::{SnapshotResponse, TracksPage};

const API_BASE: &str = "https://api.spotify.com/v1";

/// Maximum page size accepted by the tracks endpoint.
const PAGE_LIMIT: &str = "100";

/// Hard stop for `next` links (10 000 items at 100 per page, with headroom).
const MAX_PAGES: usize = 200;

const TRACK_FIELDS: &str =
    "items(added_at,added_by(id,display_name),track(name,uri,artists(name))),next";

/// Read-only client for one Spotify playlist.
pub struct SpotifyClient<A = SpotifyAuthorizer> {
    http: reqwest::Client,
    api_base: String,
    playlist_id: String,
    tokens: TokenCache<A>,
}

impl SpotifyClient<SpotifyAuthorizer> {
    /// Build a client for the configured playlist and credentials.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let http = reqwest::Client::new();
        let grant = match &config.spotify_refresh_token {
            Some(token) => Grant::RefreshToken(token.clone()),
            None => Grant::ClientCredentials,
        };
        let authorizer = SpotifyAuthorizer::new(
            http.clone(),
            config.spotify_client_id.clone(),
            config.spotify_client_secret.clone(),
            grant,
        );
        Self::new(
            http,
            config.playlist_id.clone(),
            TokenCache::new(authorizer, clock),
        )
    }
}

impl<A: Authorizer> SpotifyClient<A> {
    pub fn new(http: reqwest::Client, playlist_id: String, tokens: TokenCache<A>) -> Self {
        Self {
            http,
            api_base: API_BASE.to_string(),
            playlist_id,
            tokens,
        }
    }

    /// Point at a different API root (no trailing slash).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.tokens.get_valid().await?;

        let mut req = self.http.get(url).bearer_auth(&token);
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| WatchError::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WatchError::Fetch(format!(
                "GET {} returned status {}: {}",
                url,
                status.as_u16(),
                excerpt(&body)
            )));
        }

        resp.json::<T>().await.map_err(|e| {
            WatchError::Fetch(format!("GET {} returned an unreadable body: {}", url, e))
        })
    }
}

#[async_trait]
impl<A: Authorizer> CatalogSource for SpotifyClient<A> {
    async fn fetch_version_marker(&self) -> Result<String> {
        let url = format!("{}/playlists/{}", self.api_base, self.playlist_id);
        let snapshot: SnapshotResponse =
            self.get_json(&url, &[("fields", "snapshot_id")]).await?;
        Ok(snapshot.snapshot_id)
    }

    async fn fetch_all_items(&self) -> Result<Vec<PlaylistItem>> {
        let first = format!("{}/playlists/{}/tracks", self.api_base, self.playlist_id);
        let mut page: TracksPage = self
            .get_json(&first, &[("limit", PAGE_LIMIT), ("fields", TRACK_FIELDS)])
            .await?;

        let mut items = Vec::new();
        let mut pages = 1;
        loop {
            let next = page.next.take();
            items.extend(page.decode());

            let Some(next) = next else { break };
            if pages >= MAX_PAGES {
                return Err(WatchError::Fetch(format!(
                    "playlist {} exceeded {} pages",
                    self.playlist_id, MAX_PAGES
                )));
            }
            // `next` already carries limit/offset/fields
            page = self.get_json(&next, &[]).await?;
            pages += 1;
        }

        tracing::debug!(
            playlist = %self.playlist_id,
            pages,
            items = items.len(),
            "Fetched playlist items"
        );
        Ok(items)
    }
}

/// First 200 characters of an error body, for log-friendly messages.
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}
