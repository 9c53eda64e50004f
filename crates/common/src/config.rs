use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::types::{Party, PartyConfig, RecipientId, RoutingTarget};

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Default party A (chat id + optional display name)
    pub party_a: PartyConfig,

    /// Default party B (chat id + optional display name)
    pub party_b: PartyConfig,

    /// Spotify application credentials
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    /// Optional user refresh token; switches the token grant from
    /// client-credentials to refresh-token.
    pub spotify_refresh_token: Option<String>,

    /// Bare playlist id, already extracted from whatever was configured
    pub playlist_id: String,

    /// Time between polling cycles (default: 60s)
    pub poll_interval: Duration,

    /// Contributor key (id or display name) → routing target
    pub routing: HashMap<String, RoutingTarget>,

    /// Contributor id → display name shown in notifications
    pub display_names: HashMap<String, String>,

    /// Path of the persisted progress record
    pub state_file: PathBuf,

    /// Pause between consecutive notification deliveries (default: 1000ms)
    pub notify_delay: Duration,

    /// Optional path for a plain-text log file
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                WatchError::Config(format!("{} environment variable is required", key))
            })
        };

        let poll_interval_secs: u64 =
            parse_or(get("POLL_INTERVAL_SECONDS"), 60, "POLL_INTERVAL_SECONDS")?;
        if poll_interval_secs == 0 {
            return Err(WatchError::Config(
                "POLL_INTERVAL_SECONDS must be greater than zero".to_string(),
            ));
        }
        let notify_delay_ms: u64 = parse_or(get("NOTIFY_DELAY_MS"), 1000, "NOTIFY_DELAY_MS")?;

        let routing = parse_pairs(get("ROUTING").as_deref(), "ROUTING")?
            .into_iter()
            .map(|(key, value)| {
                RoutingTarget::parse(&value)
                    .map(|target| (key.clone(), target))
                    .ok_or_else(|| {
                        WatchError::Config(format!("ROUTING entry '{}' has an empty target", key))
                    })
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let display_names = parse_pairs(get("DISPLAY_NAMES").as_deref(), "DISPLAY_NAMES")?
            .into_iter()
            .collect();

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            party_a: PartyConfig {
                recipient: RecipientId::new(required("PARTY_A_CHAT_ID")?.trim()),
                name: get("PARTY_A_NAME"),
            },
            party_b: PartyConfig {
                recipient: RecipientId::new(required("PARTY_B_CHAT_ID")?.trim()),
                name: get("PARTY_B_NAME"),
            },
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            spotify_refresh_token: get("SPOTIFY_REFRESH_TOKEN"),
            playlist_id: playlist_id_from_input(&required("SPOTIFY_PLAYLIST")?)?,
            poll_interval: Duration::from_secs(poll_interval_secs),
            routing,
            display_names,
            state_file: get("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tunewatch-state.json")),
            notify_delay: Duration::from_millis(notify_delay_ms),
            log_file: get("LOG_FILE").map(PathBuf::from),
        })
    }

    /// Look up a default party's configuration.
    pub fn party(&self, party: Party) -> &PartyConfig {
        match party {
            Party::A => &self.party_a,
            Party::B => &self.party_b,
        }
    }
}

/// Extract a bare playlist id from a raw id, a share URL, or a `spotify:` URI.
///
/// `https://open.spotify.com/playlist/37i9dQ?si=abc` → `37i9dQ`
pub fn playlist_id_from_input(input: &str) -> Result<String> {
    let without_query = input
        .trim()
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let id = without_query
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim();

    if id.is_empty() {
        return Err(WatchError::Config(format!(
            "SPOTIFY_PLAYLIST '{}' does not contain a playlist id",
            input
        )));
    }
    Ok(id.to_string())
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WatchError::Config(format!("{} must be a valid non-negative integer", key))),
    }
}

/// Parse `key=value,key=value` into ordered pairs. Whitespace around keys and
/// values is trimmed; empty segments (e.g. a trailing comma) are ignored. A key
/// may appear only once.
fn parse_pairs(raw: Option<&str>, var: &str) -> Result<Vec<(String, String)>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                WatchError::Config(format!("{} entry '{}' is missing '='", var, segment))
            })?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(WatchError::Config(format!(
                    "{} entry '{}' needs both a key and a value",
                    var, segment
                )));
            }
            if !seen.insert(key.to_string()) {
                return Err(WatchError::Config(format!(
                    "{} repeats key '{}'",
                    var, key
                )));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
