//! Saved-search entity models and DTOs.

use std::collections::BTreeSet;

use hestia_core::criteria::{Conditions, SavedSearch};
use hestia_core::subscriber::SubscriberContact;
use hestia_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ConvertError;

/// A row from the `saved_searches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SavedSearchRow {
    pub id: DbId,
    pub subscriber_id: DbId,
    pub name: String,
    /// JSONB condition payload (see [`Conditions`]).
    pub conditions: serde_json::Value,
    /// JSON array of channel name strings.
    pub channels: serde_json::Value,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<SavedSearchRow> for SavedSearch {
    type Error = ConvertError;

    fn try_from(row: SavedSearchRow) -> Result<Self, Self::Error> {
        let conditions: Conditions =
            serde_json::from_value(row.conditions).map_err(|source| ConvertError::BadJson {
                column: "saved_searches.conditions",
                source,
            })?;

        let channels: BTreeSet<String> =
            serde_json::from_value(row.channels).map_err(|source| ConvertError::BadJson {
                column: "saved_searches.channels",
                source,
            })?;

        let search = SavedSearch {
            id: row.id,
            owner_id: row.subscriber_id,
            name: row.name,
            conditions,
            channels,
            active: row.active,
        };
        search.validate()?;
        Ok(search)
    }
}

/// A `saved_searches` row joined with its owner's contact columns, as
/// returned by `SavedSearchRepo::list_active_with_contact`.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSearchRow {
    pub id: DbId,
    pub subscriber_id: DbId,
    pub name: String,
    pub conditions: serde_json::Value,
    pub channels: serde_json::Value,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub email: String,
    pub telegram_chat_id: Option<String>,
    pub whatsapp_number: Option<String>,
}

impl ActiveSearchRow {
    /// Split into the domain search and the owner's contact details.
    pub fn into_parts(self) -> Result<(SavedSearch, SubscriberContact), ConvertError> {
        let contact = SubscriberContact {
            email: self.email,
            telegram_chat_id: self.telegram_chat_id,
            whatsapp_number: self.whatsapp_number,
        };
        let row = SavedSearchRow {
            id: self.id,
            subscriber_id: self.subscriber_id,
            name: self.name,
            conditions: self.conditions,
            channels: self.channels,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((SavedSearch::try_from(row)?, contact))
    }
}

/// DTO for creating a saved search.
#[derive(Debug, Deserialize)]
pub struct CreateSavedSearch {
    pub name: String,
    pub conditions: Conditions,
    pub channels: BTreeSet<String>,
}

/// DTO for updating a saved search (all fields optional).
#[derive(Debug, Deserialize)]
pub struct UpdateSavedSearch {
    pub name: Option<String>,
    pub conditions: Option<Conditions>,
    pub channels: Option<BTreeSet<String>>,
}
