//! Spotify Web API wire types and their decoding into `PlaylistItem`s.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use tunewatch_common::types::{ContributorRef, PlaylistItem, TrackRef};

/// Response of `POST /api/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Response of `GET /playlists/{id}?fields=snapshot_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}

/// One page of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<WireItem>,
    /// Absolute URL of the next page, `null` on the last one.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireItem {
    pub added_at: Option<String>,
    pub added_by: Option<WireUser>,
    pub track: Option<WireTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTrack {
    pub name: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireArtist {
    pub name: Option<String>,
}

impl WireItem {
    /// Convert to a `PlaylistItem`. Returns `None` when `added_at` is missing
    /// or unparseable, since such an entry can't be ordered.
    pub fn into_item(self) -> Option<PlaylistItem> {
        let added_at = DateTime::parse_from_rfc3339(self.added_at.as_deref()?)
            .ok()?
            .with_timezone(&Utc);

        let contributor = self.added_by.and_then(|user| {
            let id = user.id.filter(|id| !id.is_empty())?;
            Some(ContributorRef {
                id,
                display_name: user.display_name.filter(|n| !n.is_empty()),
            })
        });

        let track = self
            .track
            .map(|t| TrackRef {
                name: t.name,
                artists: t.artists.into_iter().filter_map(|a| a.name).collect(),
                uri: t.uri,
            })
            .unwrap_or_default();

        Some(PlaylistItem {
            added_at,
            contributor,
            track,
        })
    }
}

impl TracksPage {
    /// Decode every orderable item on the page.
    pub fn decode(self) -> Vec<PlaylistItem> {
        let total = self.items.len();
        let items: Vec<PlaylistItem> = self
            .items
            .into_iter()
            .filter_map(WireItem::into_item)
            .collect();

        if items.len() < total {
            tracing::debug!(
                skipped = total - items.len(),
                "Skipped playlist entries without a usable added_at"
            );
        }
        items
    }
}
