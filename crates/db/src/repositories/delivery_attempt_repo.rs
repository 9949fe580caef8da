//! Repository for the `delivery_attempts` table.
//!
//! Append-only audit log of notification sends. The unique constraint
//! on (saved_search_id, listing_id, channel) makes redelivered listing
//! events idempotent: a duplicate insert is detected and reported as
//! `None`, never as an error.

use hestia_core::types::DbId;
use sqlx::PgPool;

use crate::models::delivery_attempt::DeliveryAttempt;

/// Column list for `delivery_attempts` queries.
const COLUMNS: &str =
    "id, saved_search_id, listing_id, channel, status, error, created_at, completed_at";

/// Write and read operations for the delivery audit log.
pub struct DeliveryAttemptRepo;

impl DeliveryAttemptRepo {
    /// Insert a `pending` attempt row for one (search, listing, channel)
    /// triple.
    ///
    /// Returns the generated ID, or `None` when a row for the triple
    /// already exists — the attempt was recorded by an earlier pass and
    /// must not be repeated.
    pub async fn insert_pending(
        pool: &PgPool,
        saved_search_id: DbId,
        listing_id: DbId,
        channel: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO delivery_attempts (saved_search_id, listing_id, channel) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (saved_search_id, listing_id, channel) DO NOTHING \
             RETURNING id",
        )
        .bind(saved_search_id)
        .bind(listing_id)
        .bind(channel)
        .fetch_optional(pool)
        .await
    }

    /// Transition an attempt `pending -> sent`.
    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE delivery_attempts \
             SET status = 'sent', completed_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition an attempt `pending -> failed`, recording the reason.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE delivery_attempts \
             SET status = 'failed', error = $2, completed_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List the failed attempts recorded for a listing's alert pass.
    pub async fn list_failed_for_listing(
        pool: &PgPool,
        listing_id: DbId,
    ) -> Result<Vec<DeliveryAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_attempts \
             WHERE listing_id = $1 AND status = 'failed' \
             ORDER BY id"
        );
        sqlx::query_as::<_, DeliveryAttempt>(&query)
            .bind(listing_id)
            .fetch_all(pool)
            .await
    }
}
