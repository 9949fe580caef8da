//! Polling loop that feeds newly published listings to the dispatcher.
//!
//! A single long-lived Tokio task. Each tick claims every visible
//! listing that still owes its alert pass (`FOR UPDATE SKIP LOCKED`
//! claim, so parallel workers never double-claim) and runs one dispatch
//! per listing. A listing whose dispatch could not run at all is
//! reopened for the next tick; the delivery-log uniqueness constraint
//! keeps the rerun idempotent.

use std::time::Duration;

use hestia_core::listing::Listing;
use hestia_core::types::DbId;
use hestia_db::repositories::{DeliveryAttemptRepo, ListingRepo};
use hestia_db::DbPool;
use hestia_notify::AlertDispatcher;
use tokio_util::sync::CancellationToken;

/// Background worker that turns published listings into alerts.
pub struct AlertWorker {
    pool: DbPool,
    dispatcher: AlertDispatcher,
    poll_interval: Duration,
}

impl AlertWorker {
    pub fn new(pool: DbPool, dispatcher: AlertDispatcher, poll_interval: Duration) -> Self {
        Self {
            pool,
            dispatcher,
            poll_interval,
        }
    }

    /// Run the polling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Alert worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Alert worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_pending().await {
                        tracing::error!(error = %e, "Alert pass cycle failed");
                    }
                }
            }
        }
    }

    /// Claim and dispatch every listing awaiting alerts.
    async fn drain_pending(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        while let Some(row) = ListingRepo::claim_next_published(&self.pool).await? {
            let listing_id = row.id;

            let listing = match Listing::try_from(row) {
                Ok(listing) => listing,
                Err(e) => {
                    // Leave the claim in place: reopening a row this
                    // engine cannot read would re-claim it every tick.
                    tracing::error!(listing_id, error = %e, "Skipping unreadable listing");
                    continue;
                }
            };

            match self.dispatcher.dispatch(&listing).await {
                Ok(summary) => {
                    tracing::info!(
                        listing_id,
                        matched = summary.matched,
                        sent = summary.sent,
                        failed = summary.failed,
                        skipped = summary.skipped,
                        "Listing alerts dispatched",
                    );
                    if summary.failed > 0 {
                        self.log_failures(listing_id).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        listing_id,
                        error = %e,
                        "Dispatch failed, reopening listing for the next tick",
                    );
                    ListingRepo::reopen_alerts(&self.pool, listing_id).await?;
                }
            }
        }
        Ok(())
    }

    /// Surface each failed attempt's recorded reason in the worker log.
    async fn log_failures(&self, listing_id: DbId) {
        match DeliveryAttemptRepo::list_failed_for_listing(&self.pool, listing_id).await {
            Ok(attempts) => {
                for attempt in attempts {
                    tracing::warn!(
                        listing_id,
                        saved_search_id = attempt.saved_search_id,
                        channel = %attempt.channel,
                        error = attempt.error.as_deref().unwrap_or("unknown"),
                        "Delivery attempt failed",
                    );
                }
            }
            Err(e) => {
                tracing::error!(listing_id, error = %e, "Failed to read delivery attempts");
            }
        }
    }
}
