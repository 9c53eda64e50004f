pub mod poller;
pub mod state;

use std::sync::Arc;

use tunewatch_catalog::SpotifyClient;
use tunewatch_common::config::AppConfig;
use tunewatch_common::traits::SystemClock;
use tunewatch_engine::{DisplayNames, NotificationDispatcher, RecipientRouter};
use tunewatch_notifier::TelegramNotifier;

pub use poller::{CycleOutcome, Poller};
pub use state::{FileStateStore, MemoryStateStore};

/// The production wiring: Spotify in, Telegram out, JSON file for state.
pub type LivePoller = Poller<SpotifyClient, TelegramNotifier, FileStateStore>;

/// Assemble the production poller from validated configuration.
pub fn build(config: &AppConfig) -> LivePoller {
    let catalog = SpotifyClient::from_config(config, Arc::new(SystemClock));
    let router = RecipientRouter::new(&config.party_a, &config.party_b, config.routing.clone());
    let names = DisplayNames::new(config.display_names.clone());
    let notifier = TelegramNotifier::new(config.telegram_bot_token.clone());
    let dispatcher = NotificationDispatcher::new(router, names, notifier, config.notify_delay);

    Poller::new(
        catalog,
        dispatcher,
        FileStateStore::new(config.state_file.clone()),
        config.poll_interval,
    )
}
