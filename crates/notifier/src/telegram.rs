use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tunewatch_common::traits::Notifier;
use tunewatch_common::types::RecipientId;
use tunewatch_common::{Result, WatchError};

const API_BASE: &str = "https://api.telegram.org";

/// Attempts per `send`, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// First backoff for 5xx/network failures; doubles per attempt.
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Used when a 429 carries no `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Upper bound on how long a 429 may stall the cycle.
const MAX_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Envelope of every Bot API response.
#[derive(Debug, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub ok: bool,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// What to do after one HTTP attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Attempt {
    Delivered,
    Retry { wait: Duration, reason: String },
    Fatal(String),
}

/// Classify a Bot API response. `attempt` is 1-based and only affects backoff.
pub fn classify(status: u16, body: &ApiResponse, attempt: u32) -> Attempt {
    let reason = || {
        format!(
            "status {}: {}",
            status,
            body.description.as_deref().unwrap_or("no description")
        )
    };

    match status {
        200..=299 if body.ok => Attempt::Delivered,
        200..=299 => Attempt::Fatal(reason()),
        429 => {
            let secs = body
                .parameters
                .as_ref()
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                .min(MAX_RETRY_AFTER_SECS);
            Attempt::Retry {
                wait: Duration::from_secs(secs),
                reason: reason(),
            }
        }
        500..=599 => Attempt::Retry {
            wait: backoff(attempt),
            reason: reason(),
        },
        _ => Attempt::Fatal(reason()),
    }
}

fn backoff(attempt: u32) -> Duration {
    BASE_BACKOFF * 2u32.pow(attempt.saturating_sub(1))
}

/// Telegram Bot API `sendMessage` transport.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            bot_token,
        }
    }

    /// Point at a different Bot API host (no trailing slash).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn attempt(&self, recipient: &RecipientId, text: &str, attempt: u32) -> Attempt {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let request = SendMessageRequest {
            chat_id: recipient.as_str(),
            text,
            disable_web_page_preview: true,
        };

        match self.http.post(&url).json(&request).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.json::<ApiResponse>().await.unwrap_or_default();
                classify(status, &body, attempt)
            }
            // the URL contains the bot token; keep it out of the message
            Err(e) => Attempt::Retry {
                wait: backoff(attempt),
                reason: e.without_url().to_string(),
            },
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: &RecipientId, text: &str) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.attempt(recipient, text, attempt).await {
                Attempt::Delivered => return Ok(()),
                Attempt::Fatal(reason) => {
                    return Err(WatchError::Delivery(format!(
                        "sendMessage to {} failed: {}",
                        recipient, reason
                    )));
                }
                Attempt::Retry { wait, reason } => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(WatchError::Delivery(format!(
                            "sendMessage to {} failed after {} attempts: {}",
                            recipient, attempt, reason
                        )));
                    }
                    tracing::debug!(
                        recipient = %recipient,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        reason = %reason,
                        "Retrying sendMessage"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
