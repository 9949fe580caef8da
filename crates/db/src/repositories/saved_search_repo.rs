//! Repository for the `saved_searches` table.

use hestia_core::criteria::{validate_channels, CriteriaError};
use hestia_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::saved_search::{
    ActiveSearchRow, CreateSavedSearch, SavedSearchRow, UpdateSavedSearch,
};

/// Column list for `saved_searches` queries.
const COLUMNS: &str =
    "id, subscriber_id, name, conditions, channels, active, created_at, updated_at";

/// Error from a saved-search write.
///
/// Criteria violations are rejected before the statement runs, so an
/// invalid range or channel set never reaches the database.
#[derive(Debug, thiserror::Error)]
pub enum SavedSearchError {
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides CRUD operations for saved searches.
///
/// Mutations are subscriber-scoped: a search can only be edited or
/// deleted by its owner.
pub struct SavedSearchRepo;

impl SavedSearchRepo {
    /// Create a saved search for a subscriber, returning the generated ID.
    pub async fn create(
        pool: &PgPool,
        subscriber_id: DbId,
        search: &CreateSavedSearch,
    ) -> Result<DbId, SavedSearchError> {
        search.conditions.validate()?;
        validate_channels(&search.channels)?;

        let id = sqlx::query_scalar(
            "INSERT INTO saved_searches (subscriber_id, name, conditions, channels) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(subscriber_id)
        .bind(&search.name)
        .bind(Json(&search.conditions))
        .bind(Json(&search.channels))
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Update a saved search owned by the given subscriber.
    ///
    /// Absent fields are left unchanged. Returns `true` if a row was
    /// found for the owner and updated.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        subscriber_id: DbId,
        changes: &UpdateSavedSearch,
    ) -> Result<bool, SavedSearchError> {
        if let Some(conditions) = &changes.conditions {
            conditions.validate()?;
        }
        if let Some(channels) = &changes.channels {
            validate_channels(channels)?;
        }

        let result = sqlx::query(
            "UPDATE saved_searches \
             SET name = COALESCE($3, name), \
                 conditions = COALESCE($4, conditions), \
                 channels = COALESCE($5, channels), \
                 updated_at = NOW() \
             WHERE id = $1 AND subscriber_id = $2",
        )
        .bind(id)
        .bind(subscriber_id)
        .bind(changes.name.as_deref())
        .bind(changes.conditions.as_ref().map(Json))
        .bind(changes.channels.as_ref().map(Json))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Toggle a saved search active/inactive.
    ///
    /// Inactive searches are never evaluated against listings.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        subscriber_id: DbId,
        active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE saved_searches \
             SET active = $3, updated_at = NOW() \
             WHERE id = $1 AND subscriber_id = $2",
        )
        .bind(id)
        .bind(subscriber_id)
        .bind(active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a saved search owned by the given subscriber.
    ///
    /// The row is removed outright; a deleted search is never matched
    /// against subsequent listings. Its delivery history is kept
    /// (`delivery_attempts` rows are not cascaded away by the engine).
    pub async fn delete(pool: &PgPool, id: DbId, subscriber_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND subscriber_id = $2")
            .bind(id)
            .bind(subscriber_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all saved searches belonging to a subscriber.
    pub async fn list_for_subscriber(
        pool: &PgPool,
        subscriber_id: DbId,
    ) -> Result<Vec<SavedSearchRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM saved_searches \
             WHERE subscriber_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, SavedSearchRow>(&query)
            .bind(subscriber_id)
            .fetch_all(pool)
            .await
    }

    /// List every active saved search joined with its owner's contact
    /// details, for one matching pass.
    pub async fn list_active_with_contact(
        pool: &PgPool,
    ) -> Result<Vec<ActiveSearchRow>, sqlx::Error> {
        sqlx::query_as::<_, ActiveSearchRow>(
            "SELECT s.id, s.subscriber_id, s.name, s.conditions, s.channels, s.active, \
                    s.created_at, s.updated_at, \
                    u.email, u.telegram_chat_id, u.whatsapp_number \
             FROM saved_searches s \
             JOIN subscribers u ON u.id = s.subscriber_id \
             WHERE s.active = true \
             ORDER BY s.id",
        )
        .fetch_all(pool)
        .await
    }
}
