//! Saved-search match predicate.
//!
//! [`matches`] decides whether one listing satisfies one set of
//! saved-search conditions. It is a pure function: no I/O, no mutation,
//! deterministic, and it never errors — a listing field that is absent
//! simply fails the condition that needs it (fail-closed).
//!
//! Visibility is not checked here; filtering out unpublished listings is
//! the dispatcher's responsibility before the predicate ever runs.

use crate::criteria::Conditions;
use crate::listing::Listing;

/// Evaluate one listing against one set of conditions.
///
/// All present conditions must pass (conjunction); evaluation
/// short-circuits on the first failure. Conditions are independent, so
/// the evaluation order does not affect the result.
///
/// Rules, per condition kind:
/// - membership (`property_type`, `region_id`): the listing's field must
///   appear in the filter set. An empty set admits nothing.
/// - equality (`transaction`): the listing's field must equal the target.
/// - range (`price`, `bedrooms`, `bathrooms`, `area_sqm`): the listing's
///   field must fall inside the inclusive range; a missing field fails.
///   Price is taken from the listing's own transaction-kind price field,
///   never the other one.
/// - subset (`features`): every required tag must be present on the
///   listing. An empty required set admits nothing, consistent with the
///   membership rule.
///
/// No conditions at all matches everything ("browse all" alert).
pub fn matches(listing: &Listing, conditions: &Conditions) -> bool {
    if let Some(types) = &conditions.property_type {
        if !types.contains(&listing.property_type) {
            return false;
        }
    }

    if let Some(kind) = conditions.transaction {
        if listing.transaction != kind {
            return false;
        }
    }

    if let Some(regions) = &conditions.region_id {
        if !regions.contains(&listing.region_id) {
            return false;
        }
    }

    if let Some(range) = &conditions.price {
        match listing.own_price() {
            Some(price) if range.contains(price) => {}
            _ => return false,
        }
    }

    if let Some(range) = &conditions.bedrooms {
        match listing.bedrooms {
            Some(count) if range.contains(count) => {}
            _ => return false,
        }
    }

    if let Some(range) = &conditions.bathrooms {
        match listing.bathrooms {
            Some(count) if range.contains(count) => {}
            _ => return false,
        }
    }

    if let Some(range) = &conditions.area_sqm {
        match listing.area_sqm {
            Some(area) if range.contains(area) => {}
            _ => return false,
        }
    }

    if let Some(required) = &conditions.features {
        if required.is_empty() || !required.all_in(&listing.features) {
            return false;
        }
    }

    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
