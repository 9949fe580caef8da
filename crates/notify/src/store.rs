//! Collaborator seams of the alert dispatcher.
//!
//! The dispatcher receives its criteria store and delivery log as trait
//! objects rather than reaching for shared state, so tests substitute
//! in-memory fakes and the production wiring stays explicit. The
//! PostgreSQL implementations here are thin adapters over the
//! `hestia-db` repositories.

use async_trait::async_trait;
use hestia_core::criteria::SavedSearch;
use hestia_core::delivery::DeliveryStatus;
use hestia_core::subscriber::SubscriberContact;
use hestia_core::types::DbId;
use hestia_db::repositories::{DeliveryAttemptRepo, SavedSearchRepo};
use hestia_db::DbPool;

/// Boxed error for collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A saved search eligible for matching, with its owner's contact
/// details resolved.
#[derive(Debug, Clone)]
pub struct ActiveSearch {
    pub search: SavedSearch,
    pub contact: SubscriberContact,
}

/// Source of the saved searches to evaluate in one matching pass.
#[async_trait]
pub trait CriteriaStore: Send + Sync {
    /// All currently active saved searches, reflecting the most recent
    /// committed state: a deleted or deactivated search must not appear.
    async fn list_active(&self) -> Result<Vec<ActiveSearch>, BoxError>;
}

/// Terminal result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Sent,
    /// Failed, with the reason recorded on the audit row.
    Failed(String),
}

impl AttemptOutcome {
    /// The status this outcome transitions the attempt row to.
    pub fn status(&self) -> DeliveryStatus {
        match self {
            Self::Sent => DeliveryStatus::Sent,
            Self::Failed(_) => DeliveryStatus::Failed,
        }
    }
}

/// Append-only audit log of delivery attempts.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Record a `pending` attempt for one (search, listing, channel)
    /// triple. Returns `None` when the triple was already recorded by an
    /// earlier pass (idempotent redelivery), in which case no send must
    /// happen.
    async fn begin(
        &self,
        saved_search_id: DbId,
        listing_id: DbId,
        channel: &str,
    ) -> Result<Option<DbId>, BoxError>;

    /// Transition a `pending` attempt to its terminal state.
    async fn complete(&self, attempt_id: DbId, outcome: AttemptOutcome) -> Result<(), BoxError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementations
// ---------------------------------------------------------------------------

/// [`CriteriaStore`] backed by the `saved_searches` table.
pub struct PgCriteriaStore {
    pool: DbPool,
}

impl PgCriteriaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CriteriaStore for PgCriteriaStore {
    async fn list_active(&self) -> Result<Vec<ActiveSearch>, BoxError> {
        let rows = SavedSearchRepo::list_active_with_contact(&self.pool).await?;

        let mut searches = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_parts() {
                Ok((search, contact)) => searches.push(ActiveSearch { search, contact }),
                Err(e) => {
                    // One malformed stored search must not abort the
                    // whole matching pass.
                    tracing::warn!(
                        saved_search_id = id,
                        error = %e,
                        "Skipping malformed saved search"
                    );
                }
            }
        }
        Ok(searches)
    }
}

/// [`DeliveryLog`] backed by the `delivery_attempts` table.
pub struct PgDeliveryLog {
    pool: DbPool,
}

impl PgDeliveryLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLog for PgDeliveryLog {
    async fn begin(
        &self,
        saved_search_id: DbId,
        listing_id: DbId,
        channel: &str,
    ) -> Result<Option<DbId>, BoxError> {
        let id =
            DeliveryAttemptRepo::insert_pending(&self.pool, saved_search_id, listing_id, channel)
                .await?;
        Ok(id)
    }

    async fn complete(&self, attempt_id: DbId, outcome: AttemptOutcome) -> Result<(), BoxError> {
        tracing::debug!(
            attempt_id,
            status = outcome.status().as_str(),
            "Recording delivery outcome"
        );
        match outcome {
            AttemptOutcome::Sent => DeliveryAttemptRepo::mark_sent(&self.pool, attempt_id).await?,
            AttemptOutcome::Failed(reason) => {
                DeliveryAttemptRepo::mark_failed(&self.pool, attempt_id, &reason).await?
            }
        }
        Ok(())
    }
}
