use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who added an item to the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRef {
    /// Catalog user id (opaque).
    pub id: String,
    /// Display name as reported by the catalog, if any.
    pub display_name: Option<String>,
}

impl ContributorRef {
    pub fn new(id: impl Into<String>, display_name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.map(str::to_string),
        }
    }
}

/// Display data for an added track. Only used for logging; notifications
/// never include track details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub name: Option<String>,
    pub artists: Vec<String>,
    pub uri: Option<String>,
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("<unknown track>");
        if self.artists.is_empty() {
            write!(f, "{}", name)
        } else {
            write!(f, "{} - {}", self.artists.join(", "), name)
        }
    }
}

/// One entry of the watched playlist, as of the latest fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub added_at: DateTime<Utc>,
    pub contributor: Option<ContributorRef>,
    pub track: TrackRef,
}

/// The only persisted record: how far the watcher has gotten.
///
/// `watermark` is the `added_at` of the most recently processed item, or
/// `None` when nothing has been processed yet (e.g. the playlist was empty at
/// initialization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub version_marker: String,
    pub watermark: Option<DateTime<Utc>>,
}

/// A notification target (a chat id for the Telegram transport).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecipientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two default parties sharing the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    A,
    B,
}

impl Party {
    /// The party that is not `self`.
    pub fn counterpart(self) -> Party {
        match self {
            Party::A => Party::B,
            Party::B => Party::A,
        }
    }

    /// Parse a party letter (`A`/`B`, case-insensitive, surrounding whitespace ignored).
    pub fn from_letter(s: &str) -> Option<Party> {
        match s.trim() {
            "A" | "a" => Some(Party::A),
            "B" | "b" => Some(Party::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::A => write!(f, "A"),
            Party::B => write!(f, "B"),
        }
    }
}

/// A default party: who they are to the chat transport, plus an optional
/// display name. A contributor whose id equals `recipient` or whose display
/// name matches `name` (case-insensitively) is recognised as this party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyConfig {
    pub recipient: RecipientId,
    pub name: Option<String>,
}

impl PartyConfig {
    /// Name for logs: the display name, or the recipient id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.recipient.as_str())
    }
}

/// Where a routing rule sends notifications for a contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingTarget {
    /// The contributor is this party; notify the other one.
    Counterpart(Party),
    /// Notify exactly this recipient. If it equals a default party's id the
    /// contributor is treated as that party.
    Explicit(RecipientId),
}

impl RoutingTarget {
    /// Parse a routing value: a party letter, or any other non-empty string as
    /// an explicit recipient id.
    pub fn parse(value: &str) -> Option<RoutingTarget> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(match Party::from_letter(value) {
            Some(party) => RoutingTarget::Counterpart(party),
            None => RoutingTarget::Explicit(RecipientId::new(value)),
        })
    }
}
