//! External delivery channels behind a uniform send interface.
//!
//! The dispatcher treats every channel identically: one
//! [`NotificationGateway::send`] call, one success-or-failure result.
//! Channel specifics live entirely in the per-channel modules.

use async_trait::async_trait;
use hestia_core::channels::{CHANNEL_EMAIL, CHANNEL_TELEGRAM, CHANNEL_WHATSAPP};

use crate::notice::MatchNotice;

pub mod chat;
pub mod email;

use chat::{ChatError, ChatGateway};
use email::{EmailError, EmailGateway};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error from one notification send attempt.
///
/// Captured per attempt by the dispatcher and recorded on the `failed`
/// audit row; never propagated past the dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The channel exists but this deployment has no provider for it
    /// (e.g. no SMTP host or no bot webhook configured).
    #[error("channel {0} is not configured for delivery")]
    NotConfigured(String),

    /// A channel name the gateway does not recognize at all.
    #[error("unsupported delivery channel: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

// ---------------------------------------------------------------------------
// NotificationGateway
// ---------------------------------------------------------------------------

/// Uniform send interface over every delivery channel.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver one notice to one recipient on one channel.
    async fn send(
        &self,
        channel: &str,
        recipient: &str,
        notice: &MatchNotice,
    ) -> Result<(), GatewayError>;
}

// ---------------------------------------------------------------------------
// ChannelGateways
// ---------------------------------------------------------------------------

/// The production gateway: multiplexes sends to the SMTP mailer or the
/// chat-bot webhook bridge by channel name.
pub struct ChannelGateways {
    /// Present only when SMTP is configured for this deployment.
    email: Option<EmailGateway>,
    chat: ChatGateway,
}

impl ChannelGateways {
    pub fn new(email: Option<EmailGateway>, chat: ChatGateway) -> Self {
        Self { email, chat }
    }
}

#[async_trait]
impl NotificationGateway for ChannelGateways {
    async fn send(
        &self,
        channel: &str,
        recipient: &str,
        notice: &MatchNotice,
    ) -> Result<(), GatewayError> {
        match channel {
            CHANNEL_EMAIL => match &self.email {
                Some(mailer) => Ok(mailer.deliver(recipient, notice).await?),
                None => Err(GatewayError::NotConfigured(channel.to_string())),
            },
            CHANNEL_TELEGRAM | CHANNEL_WHATSAPP => match self.chat.webhook_for(channel) {
                Some(url) => Ok(self.chat.deliver(channel, url, recipient, notice).await?),
                None => Err(GatewayError::NotConfigured(channel.to_string())),
            },
            other => Err(GatewayError::Unsupported(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
