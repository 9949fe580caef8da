//! Delivery-attempt audit entity model.

use hestia_core::delivery::DeliveryStatus;
use hestia_core::listing::UnknownVariant;
use hestia_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `delivery_attempts` table.
///
/// One row per (saved search, listing, channel) triple; the table's
/// uniqueness constraint makes redelivered listing events idempotent.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryAttempt {
    pub id: DbId,
    pub saved_search_id: DbId,
    pub listing_id: DbId,
    pub channel: String,
    pub status: String,
    /// Failure reason, present when `status = 'failed'`.
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl DeliveryAttempt {
    /// Parse the stored status text.
    pub fn status(&self) -> Result<DeliveryStatus, UnknownVariant> {
        self.status.parse()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn stored_status_text_parses() {
        let attempt = DeliveryAttempt {
            id: 1,
            saved_search_id: 2,
            listing_id: 3,
            channel: "email".to_string(),
            status: "sent".to_string(),
            error: None,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        assert_eq!(attempt.status().unwrap(), DeliveryStatus::Sent);
    }
}
