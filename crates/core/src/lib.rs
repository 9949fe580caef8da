//! Hestia core domain types.
//!
//! Pure domain layer for the saved-search alert engine: the listing and
//! saved-search models, delivery channel constants, the delivery-attempt
//! state machine, and the match predicate that decides which saved
//! searches a newly published listing satisfies.
//!
//! This crate performs no I/O and has no async or database dependency,
//! so it can be used by the persistence layer, the alert worker, and any
//! future CLI tooling alike.

pub mod channels;
pub mod criteria;
pub mod delivery;
pub mod listing;
pub mod matching;
pub mod subscriber;
pub mod types;

pub use criteria::{Conditions, CriteriaError, RangeFilter, SavedSearch, SetFilter};
pub use delivery::DeliveryStatus;
pub use listing::{Listing, PropertyType, TransactionKind, UnknownVariant};
pub use matching::matches;
pub use subscriber::SubscriberContact;
