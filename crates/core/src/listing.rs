//! Property listing domain model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::DbId;

/// Error returned when stored text does not name a known enum variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which enum the value was parsed as (e.g. `"property_type"`).
    pub kind: &'static str,
    /// The offending stored text.
    pub value: String,
}

// ---------------------------------------------------------------------------
// PropertyType
// ---------------------------------------------------------------------------

/// Property category of a listing.
///
/// Serialized and stored as snake_case text (`listings.property_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    Villa,
    Townhouse,
    Penthouse,
    Plot,
    Commercial,
}

impl PropertyType {
    /// Canonical text form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Villa => "villa",
            Self::Townhouse => "townhouse",
            Self::Penthouse => "penthouse",
            Self::Plot => "plot",
            Self::Commercial => "commercial",
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apartment" => Ok(Self::Apartment),
            "villa" => Ok(Self::Villa),
            "townhouse" => Ok(Self::Townhouse),
            "penthouse" => Ok(Self::Penthouse),
            "plot" => Ok(Self::Plot),
            "commercial" => Ok(Self::Commercial),
            other => Err(UnknownVariant {
                kind: "property_type",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionKind
// ---------------------------------------------------------------------------

/// Whether a listing is offered for sale or for rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Rent,
}

impl TransactionKind {
    /// Canonical text form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "rent" => Ok(Self::Rent),
            other => Err(UnknownVariant {
                kind: "transaction",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// A property listing as seen by the alert engine.
///
/// Immutable for the duration of one matching pass; the matcher and the
/// dispatcher never mutate it. Only listings with `visible = true` are
/// ever evaluated against saved searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: DbId,
    /// Stable external reference used in notification deep links.
    pub public_id: Uuid,
    pub title: String,
    pub property_type: PropertyType,
    pub transaction: TransactionKind,
    pub region_id: DbId,
    /// Asking price when offered for sale (whole currency units).
    pub price_sale: Option<i64>,
    /// Monthly price when offered for rent (whole currency units).
    pub price_rent: Option<i64>,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<i16>,
    pub area_sqm: Option<i32>,
    /// Normalized feature tags, e.g. `"pool"`, `"sea-view"`.
    pub features: BTreeSet<String>,
    /// Whether the listing is published on the public site.
    pub visible: bool,
}

impl Listing {
    /// The price that applies to this listing's own transaction kind.
    ///
    /// A sale listing is never judged by its rent price and vice versa,
    /// even when the other field happens to be populated.
    pub fn own_price(&self) -> Option<i64> {
        match self.transaction {
            TransactionKind::Sale => self.price_sale,
            TransactionKind::Rent => self.price_rent,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
