//! Narrow interfaces between the core and its external collaborators.
//!
//! The engine and the poller are generic over these traits; production
//! implementations live in `tunewatch-catalog`, `tunewatch-notifier` and
//! `tunewatch-poller`, and tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{PlaylistItem, ProgressState, RecipientId};

/// Read access to the watched playlist.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Cheap summary marker that changes whenever the playlist changes.
    /// Fails with `WatchError::Fetch`.
    async fn fetch_version_marker(&self) -> Result<String>;

    /// Every item currently in the playlist, pagination already flattened.
    /// Fails with `WatchError::Fetch`.
    async fn fetch_all_items(&self) -> Result<Vec<PlaylistItem>>;
}

/// Delivers one message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fails with `WatchError::Delivery`.
    async fn send(&self, recipient: &RecipientId, text: &str) -> Result<()>;
}

/// Durable home of the `ProgressState` record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Missing or unreadable records load as `None`.
    async fn load(&self) -> Option<ProgressState>;

    /// Replace the record atomically.
    async fn save(&self, state: &ProgressState) -> Result<()>;
}

/// Injected wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
