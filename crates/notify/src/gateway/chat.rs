//! Chat-bot alert delivery over webhook bridges.
//!
//! [`ChatGateway`] posts a JSON-encoded [`MatchNotice`] to the bot
//! bridge configured for each chat channel (Telegram, WhatsApp). One
//! POST per attempt; the dispatcher owns retry policy, so a failed
//! request is reported, not retried here.

use std::time::Duration;

use serde_json::json;

use crate::notice::MatchNotice;
use hestia_core::channels::{CHANNEL_TELEGRAM, CHANNEL_WHATSAPP};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for chat delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The bridge returned a non-2xx status code.
    #[error("chat bridge returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Webhook endpoints of the chat-bot bridges.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub telegram_webhook_url: Option<String>,
    pub whatsapp_webhook_url: Option<String>,
}

impl ChatConfig {
    /// Load bridge endpoints from `TELEGRAM_WEBHOOK_URL` and
    /// `WHATSAPP_WEBHOOK_URL`. An unset variable leaves that channel
    /// unconfigured.
    pub fn from_env() -> Self {
        Self {
            telegram_webhook_url: std::env::var("TELEGRAM_WEBHOOK_URL").ok(),
            whatsapp_webhook_url: std::env::var("WHATSAPP_WEBHOOK_URL").ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatGateway
// ---------------------------------------------------------------------------

/// Delivers matched-listing alerts to chat-bot bridge endpoints.
pub struct ChatGateway {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatGateway {
    /// Create a new gateway with a pre-configured HTTP client.
    pub fn new(config: ChatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    /// The bridge endpoint for a chat channel, if configured.
    pub fn webhook_for(&self, channel: &str) -> Option<&str> {
        match channel {
            CHANNEL_TELEGRAM => self.config.telegram_webhook_url.as_deref(),
            CHANNEL_WHATSAPP => self.config.whatsapp_webhook_url.as_deref(),
            _ => None,
        }
    }

    /// POST one notice to a bridge endpoint for the given recipient.
    pub async fn deliver(
        &self,
        channel: &str,
        url: &str,
        recipient: &str,
        notice: &MatchNotice,
    ) -> Result<(), ChatError> {
        let payload = json!({
            "recipient": recipient,
            "notice": notice,
        });

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        tracing::info!(channel, recipient, search = %notice.search_name, "Chat alert delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_lookup_follows_configuration() {
        let gateway = ChatGateway::new(ChatConfig {
            telegram_webhook_url: Some("https://bridge.local/tg".to_string()),
            whatsapp_webhook_url: None,
        });
        assert_eq!(gateway.webhook_for(CHANNEL_TELEGRAM), Some("https://bridge.local/tg"));
        assert_eq!(gateway.webhook_for(CHANNEL_WHATSAPP), None);
        assert_eq!(gateway.webhook_for("email"), None);
    }

    #[test]
    fn chat_error_display_http_status() {
        assert_eq!(ChatError::HttpStatus(503).to_string(), "chat bridge returned HTTP 503");
    }
}
