//! Saved-search criteria model.
//!
//! A [`SavedSearch`] is a subscriber's named bundle of filter
//! [`Conditions`] plus the delivery channels matching listings should be
//! announced on. Conditions are a closed set of typed filters rather
//! than an open dictionary, so the matcher can handle every variant
//! exhaustively.
//!
//! The condition payload is persisted as JSONB. Unknown keys in a stored
//! payload are ignored on deserialization: an older engine stays safe
//! against a newer schema and simply does not constrain on fields it
//! does not know about.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::channels::is_known_channel;
use crate::listing::{PropertyType, TransactionKind};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Validation error for saved-search criteria.
///
/// These are the only errors in the alert engine that abort an operation
/// and surface to the caller (when a subscriber creates or edits a
/// saved search). Matching itself never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    /// A numeric range filter has `min` greater than `max`.
    #[error("invalid {field} range: min {min} is greater than max {max}")]
    InvalidRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// A saved search must subscribe to at least one delivery channel.
    #[error("a saved search must subscribe to at least one delivery channel")]
    NoChannels,

    /// A channel name not known to the platform.
    #[error("unknown delivery channel: {0}")]
    UnknownChannel(String),
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// An inclusive numeric range with optional bounds.
///
/// Serialized as `{"min": .., "max": ..}`; either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RangeFilter<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> RangeFilter<T> {
    /// Whether `value` falls inside the range (inclusive on both ends).
    pub fn contains(&self, value: T) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// A set-membership filter.
///
/// Serialized as a plain JSON array. An empty set is a valid filter that
/// admits no value at all; it is deliberately distinct from an absent
/// filter, which admits every value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetFilter<T: Ord>(pub BTreeSet<T>);

impl<T: Ord> SetFilter<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every value in this filter appears in `other` (subset
    /// test, used for required feature tags).
    pub fn all_in(&self, other: &BTreeSet<T>) -> bool {
        self.0.iter().all(|v| other.contains(v))
    }
}

impl<T: Ord> FromIterator<T> for SetFilter<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// The filter conditions of one saved search.
///
/// Every field is optional; an absent field imposes no constraint. A
/// search with no conditions at all matches every visible listing (the
/// "browse all" alert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Conditions {
    /// Acceptable property categories (membership).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<SetFilter<PropertyType>>,

    /// Required transaction kind (equality).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionKind>,

    /// Acceptable regions (membership).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<SetFilter<DbId>>,

    /// Price range, evaluated against the listing's own
    /// transaction-kind price field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<RangeFilter<i64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<RangeFilter<i16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<RangeFilter<i16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<RangeFilter<i32>>,

    /// Feature tags the listing must all carry (subset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<SetFilter<String>>,
}

impl Conditions {
    /// Whether no condition is present at all.
    pub fn is_unconstrained(&self) -> bool {
        self.property_type.is_none()
            && self.transaction.is_none()
            && self.region_id.is_none()
            && self.price.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.area_sqm.is_none()
            && self.features.is_none()
    }

    /// Check every present range filter for ordered bounds.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        check_range("price", &self.price, |v| v)?;
        check_range("bedrooms", &self.bedrooms, |v| i64::from(v))?;
        check_range("bathrooms", &self.bathrooms, |v| i64::from(v))?;
        check_range("area_sqm", &self.area_sqm, |v| i64::from(v))?;
        Ok(())
    }
}

/// Check a channel subscription set: non-empty, every name known.
pub fn validate_channels(channels: &BTreeSet<String>) -> Result<(), CriteriaError> {
    if channels.is_empty() {
        return Err(CriteriaError::NoChannels);
    }
    for channel in channels {
        if !is_known_channel(channel) {
            return Err(CriteriaError::UnknownChannel(channel.clone()));
        }
    }
    Ok(())
}

fn check_range<T: PartialOrd + Copy>(
    field: &'static str,
    filter: &Option<RangeFilter<T>>,
    widen: impl Fn(T) -> i64,
) -> Result<(), CriteriaError> {
    if let Some(range) = filter {
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(CriteriaError::InvalidRange {
                    field,
                    min: widen(min),
                    max: widen(max),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SavedSearch
// ---------------------------------------------------------------------------

/// A subscriber's saved search: named filter conditions plus the
/// delivery channels matches should be announced on.
///
/// Created and mutated only by the owning subscriber; the matcher and
/// dispatcher treat it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub conditions: Conditions,
    /// Subscribed delivery channels. Set semantics: duplicates collapse.
    pub channels: BTreeSet<String>,
    pub active: bool,
}

impl SavedSearch {
    /// Build a validated saved search.
    pub fn new(
        id: DbId,
        owner_id: DbId,
        name: impl Into<String>,
        conditions: Conditions,
        channels: BTreeSet<String>,
    ) -> Result<Self, CriteriaError> {
        let search = Self {
            id,
            owner_id,
            name: name.into(),
            conditions,
            channels,
            active: true,
        };
        search.validate()?;
        Ok(search)
    }

    /// Validate conditions and channel subscriptions.
    ///
    /// Run at construction and again after deserializing a stored row,
    /// so a payload written by a newer schema still gets checked against
    /// the invariants this engine relies on.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        self.conditions.validate()?;
        validate_channels(&self.channels)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::channels::CHANNEL_EMAIL;

    fn email_only() -> BTreeSet<String> {
        BTreeSet::from([CHANNEL_EMAIL.to_string()])
    }

    #[test]
    fn empty_conditions_are_valid_and_unconstrained() {
        let conditions = Conditions::default();
        assert!(conditions.is_unconstrained());
        assert!(conditions.validate().is_ok());
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let conditions = Conditions {
            price: Some(RangeFilter {
                min: Some(200_000),
                max: Some(100_000),
            }),
            ..Default::default()
        };
        assert_matches!(
            conditions.validate(),
            Err(CriteriaError::InvalidRange {
                field: "price",
                min: 200_000,
                max: 100_000,
            })
        );
    }

    #[test]
    fn half_open_range_is_valid() {
        let conditions = Conditions {
            price: Some(RangeFilter {
                min: Some(500_000),
                max: None,
            }),
            ..Default::default()
        };
        assert!(conditions.validate().is_ok());
    }

    #[test]
    fn search_without_channels_is_rejected() {
        let err =
            SavedSearch::new(1, 1, "anything", Conditions::default(), BTreeSet::new()).unwrap_err();
        assert_eq!(err, CriteriaError::NoChannels);
    }

    #[test]
    fn search_with_unknown_channel_is_rejected() {
        let channels = BTreeSet::from(["carrier-pigeon".to_string()]);
        let err = SavedSearch::new(1, 1, "anything", Conditions::default(), channels).unwrap_err();
        assert_eq!(err, CriteriaError::UnknownChannel("carrier-pigeon".into()));
    }

    #[test]
    fn duplicate_channels_collapse() {
        // BTreeSet semantics: the same channel twice is one subscription.
        let channels: BTreeSet<String> =
            [CHANNEL_EMAIL, CHANNEL_EMAIL].iter().map(|c| c.to_string()).collect();
        let search = SavedSearch::new(1, 1, "dupes", Conditions::default(), channels).unwrap();
        assert_eq!(search.channels.len(), 1);
    }

    #[test]
    fn unknown_json_keys_are_ignored() {
        // A payload written by a newer schema version: the extra key is
        // dropped rather than rejected.
        let payload = serde_json::json!({
            "price": {"min": 100_000},
            "orientation": "south",
        });
        let conditions: Conditions = serde_json::from_value(payload).unwrap();
        assert_eq!(
            conditions.price,
            Some(RangeFilter {
                min: Some(100_000),
                max: None,
            })
        );
    }

    #[test]
    fn conditions_round_trip_through_json() {
        let conditions = Conditions {
            property_type: Some(
                [PropertyType::Villa, PropertyType::Penthouse].into_iter().collect(),
            ),
            transaction: Some(TransactionKind::Sale),
            price: Some(RangeFilter {
                min: Some(250_000),
                max: Some(900_000),
            }),
            features: Some(["pool".to_string()].into_iter().collect()),
            ..Default::default()
        };

        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json["property_type"], serde_json::json!(["villa", "penthouse"]));

        let back: Conditions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conditions);
    }

    #[test]
    fn empty_set_filter_is_representable() {
        let payload = serde_json::json!({"region_id": []});
        let conditions: Conditions = serde_json::from_value(payload).unwrap();
        let filter = conditions.region_id.expect("filter should survive deserialization");
        assert!(filter.is_empty());
    }

    #[test]
    fn valid_search_passes_validation() {
        let search = SavedSearch::new(
            7,
            3,
            "Sea-view villas",
            Conditions {
                property_type: Some([PropertyType::Villa].into_iter().collect()),
                price: Some(RangeFilter {
                    min: Some(500_000),
                    max: None,
                }),
                ..Default::default()
            },
            email_only(),
        )
        .unwrap();
        assert!(search.active);
        assert_eq!(search.name, "Sea-view villas");
    }
}
