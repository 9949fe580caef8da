//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod delivery_attempt_repo;
pub mod listing_repo;
pub mod saved_search_repo;

pub use delivery_attempt_repo::DeliveryAttemptRepo;
pub use listing_repo::ListingRepo;
pub use saved_search_repo::{SavedSearchError, SavedSearchRepo};
