//! Notification delivery.
//!
//! Only Telegram is supported. Each `send` makes up to [`telegram::MAX_ATTEMPTS`]
//! HTTP calls, honouring `retry_after` on 429 and backing off on 5xx and
//! network errors. Anything else fails fast with `WatchError::Delivery`.

pub mod telegram;

pub use telegram::TelegramNotifier;
