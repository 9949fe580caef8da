//! Repository for the `listings` table.
//!
//! The alert engine does not create or edit listings; it only claims
//! published listings that still owe a match pass. Claiming uses
//! `FOR UPDATE SKIP LOCKED` so two workers never pick up the same
//! listing.

use hestia_core::types::DbId;
use sqlx::PgPool;

use crate::models::listing::ListingRow;

/// Column list for `listings` queries.
const COLUMNS: &str = "id, public_id, title, property_type, transaction, region_id, \
     price_sale, price_rent, bedrooms, bathrooms, area_sqm, features, visible, \
     alert_dispatched_at, created_at, updated_at";

/// Read and claim operations for listings.
pub struct ListingRepo;

impl ListingRepo {
    /// Atomically claim the next publicly visible listing that has not
    /// had its alert pass yet.
    ///
    /// The claim sets `alert_dispatched_at` in the same statement, so a
    /// concurrent worker (or the next tick) skips the row. Returns
    /// `None` when nothing is waiting.
    pub async fn claim_next_published(pool: &PgPool) -> Result<Option<ListingRow>, sqlx::Error> {
        let query = format!(
            "UPDATE listings \
             SET alert_dispatched_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM listings \
                 WHERE visible = true AND alert_dispatched_at IS NULL \
                 ORDER BY id \
                 FOR UPDATE SKIP LOCKED \
                 LIMIT 1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ListingRow>(&query).fetch_optional(pool).await
    }

    /// Reopen a claimed listing for another alert pass.
    ///
    /// Used when a dispatch could not run at all (e.g. the criteria
    /// store was unreachable); the delivery-log uniqueness constraint
    /// keeps the rerun idempotent for any attempts that were written.
    pub async fn reopen_alerts(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE listings \
             SET alert_dispatched_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
