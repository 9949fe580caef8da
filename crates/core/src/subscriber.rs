//! Subscriber contact details used to resolve per-channel recipients.

use serde::{Deserialize, Serialize};

use crate::channels::{CHANNEL_EMAIL, CHANNEL_TELEGRAM, CHANNEL_WHATSAPP};

/// The delivery addresses of one subscriber.
///
/// Email is mandatory at signup; chat identities are only present once
/// the subscriber has linked the corresponding bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberContact {
    pub email: String,
    pub telegram_chat_id: Option<String>,
    pub whatsapp_number: Option<String>,
}

impl SubscriberContact {
    /// The recipient address for a delivery channel, if the subscriber
    /// has one configured. `None` for unknown channels as well.
    pub fn recipient_for(&self, channel: &str) -> Option<&str> {
        match channel {
            CHANNEL_EMAIL => Some(self.email.as_str()),
            CHANNEL_TELEGRAM => self.telegram_chat_id.as_deref(),
            CHANNEL_WHATSAPP => self.whatsapp_number.as_deref(),
            _ => None,
        }
    }
}
