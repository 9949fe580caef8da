//! Listing entity model.

use std::collections::BTreeSet;

use hestia_core::listing::{Listing, PropertyType, TransactionKind};
use hestia_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::ConvertError;

/// A row from the `listings` table.
///
/// Enum-valued columns are kept as text and `features` as raw JSONB
/// here; [`TryFrom`] produces the typed [`Listing`] the matcher works
/// on, surfacing bad stored data as a [`ConvertError`] instead of
/// panicking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ListingRow {
    pub id: DbId,
    pub public_id: Uuid,
    pub title: String,
    pub property_type: String,
    pub transaction: String,
    pub region_id: DbId,
    pub price_sale: Option<i64>,
    pub price_rent: Option<i64>,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<i16>,
    pub area_sqm: Option<i32>,
    /// JSON array of feature tag strings.
    pub features: serde_json::Value,
    pub visible: bool,
    /// Set once the alert worker has completed a match pass for this
    /// listing; `NULL` means the listing is still awaiting alerts.
    pub alert_dispatched_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ListingRow> for Listing {
    type Error = ConvertError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let property_type: PropertyType =
            row.property_type.parse().map_err(|_| ConvertError::BadEnumText {
                column: "listings.property_type",
                value: row.property_type.clone(),
            })?;

        let transaction: TransactionKind =
            row.transaction.parse().map_err(|_| ConvertError::BadEnumText {
                column: "listings.transaction",
                value: row.transaction.clone(),
            })?;

        let features: BTreeSet<String> =
            serde_json::from_value(row.features).map_err(|source| ConvertError::BadJson {
                column: "listings.features",
                source,
            })?;

        Ok(Listing {
            id: row.id,
            public_id: row.public_id,
            title: row.title,
            property_type,
            transaction,
            region_id: row.region_id,
            price_sale: row.price_sale,
            price_rent: row.price_rent,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            area_sqm: row.area_sqm,
            features,
            visible: row.visible,
        })
    }
}
