//! The message payload sent to a subscriber for one matched listing.

use hestia_core::criteria::SavedSearch;
use hestia_core::listing::{Listing, PropertyType, TransactionKind};
use hestia_core::types::DbId;
use serde::Serialize;
use uuid::Uuid;

/// One matched-listing notification, rendered per channel: email builds
/// a subject and plain-text body from it, chat channels post it as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MatchNotice {
    /// The saved search that matched, by its subscriber-given name.
    pub search_name: String,
    pub listing_title: String,
    pub property_type: PropertyType,
    pub transaction: TransactionKind,
    /// The price for the listing's own transaction kind.
    pub price: Option<i64>,
    pub region_id: DbId,
    /// Stable listing reference for deep links.
    pub listing_ref: Uuid,
}

impl MatchNotice {
    /// Build the notice for one (search, listing) match.
    pub fn new(search: &SavedSearch, listing: &Listing) -> Self {
        Self {
            search_name: search.name.clone(),
            listing_title: listing.title.clone(),
            property_type: listing.property_type,
            transaction: listing.transaction,
            price: listing.own_price(),
            region_id: listing.region_id,
            listing_ref: listing.public_id,
        }
    }

    /// Email subject line.
    pub fn subject(&self) -> String {
        format!("[Hestia] New match for \"{}\"", self.search_name)
    }

    /// Plain-text email body.
    pub fn body_text(&self) -> String {
        let price = match self.price {
            Some(p) => format!("{p} EUR"),
            None => "price on request".to_string(),
        };
        format!(
            "{title}\n{kind} {transaction}, {price}\nReference: {reference}\n",
            title = self.listing_title,
            kind = self.property_type.as_str(),
            transaction = self.transaction.as_str(),
            price = price,
            reference = self.listing_ref,
        )
    }
}
