//! Database row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Conversions into the `hestia-core` domain types
//! - `Deserialize` create/update DTOs where the entity is edited by
//!   subscribers

use hestia_core::criteria::CriteriaError;

pub mod delivery_attempt;
pub mod listing;
pub mod saved_search;

/// Error converting a stored row into its domain representation.
///
/// Raised when a row written by another schema version (or touched by
/// hand) no longer satisfies the domain invariants. Callers decide
/// whether to skip the row or abort; conversion itself never panics.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A text column holds a value that is not a known enum variant.
    #[error("column {column} holds unrecognized value: {value}")]
    BadEnumText { column: &'static str, value: String },

    /// A JSONB column failed to deserialize.
    #[error("column {column} holds malformed JSON")]
    BadJson {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The converted value violates a criteria invariant.
    #[error(transparent)]
    InvalidCriteria(#[from] CriteriaError),
}
