//! The alert dispatcher: one matching pass for one published listing.
//!
//! [`AlertDispatcher::dispatch`] loads every active saved search,
//! evaluates the match predicate, and for each match fans out one
//! delivery attempt per subscribed channel. Every attempt is written to
//! the audit log in `pending` state before the send and transitioned to
//! `sent` or `failed` afterwards; one channel's failure or latency never
//! blocks another's attempt, and no gateway error escapes to the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use hestia_core::listing::Listing;
use hestia_core::matching;
use serde::Serialize;

use crate::gateway::NotificationGateway;
use crate::notice::MatchNotice;
use crate::store::{ActiveSearch, AttemptOutcome, BoxError, CriteriaStore, DeliveryLog};

/// Default cap on concurrent sends within one dispatch.
const DEFAULT_SEND_CONCURRENCY: usize = 8;

/// Default wallclock bound on one send operation.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Tunables for the notification fan-out.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of in-flight sends at once.
    pub send_concurrency: usize,
    /// Per-send timeout; a hung gateway call is failed, not awaited
    /// forever.
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            send_concurrency: DEFAULT_SEND_CONCURRENCY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// What one dispatch call did. Partial failure is observed here, not
/// through errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Active saved searches evaluated.
    pub evaluated: usize,
    /// Searches whose conditions the listing satisfied.
    pub matched: usize,
    /// Delivery attempts processed (excluding duplicates of an earlier
    /// pass).
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Attempts skipped because the (search, listing, channel) triple
    /// was already recorded — the idempotent-redelivery path.
    pub skipped: usize,
}

/// Error from a dispatch call.
///
/// Only a criteria-store load failure aborts a dispatch; everything
/// downstream is isolated per attempt and reported in the summary.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to load active saved searches")]
    Store(#[source] BoxError),
}

/// Terminal classification of one fan-out unit, folded into the summary.
enum SendResult {
    Sent,
    Failed,
    Duplicate,
}

// ---------------------------------------------------------------------------
// AlertDispatcher
// ---------------------------------------------------------------------------

/// Orchestrates matching and notification fan-out for published
/// listings.
///
/// Collaborators are injected; the dispatcher holds no ambient state and
/// mutates neither saved searches nor listings. Two dispatch calls for
/// different listings are fully independent and may run in parallel.
pub struct AlertDispatcher {
    store: Arc<dyn CriteriaStore>,
    log: Arc<dyn DeliveryLog>,
    gateway: Arc<dyn NotificationGateway>,
    config: DispatcherConfig,
}

impl AlertDispatcher {
    pub fn new(
        store: Arc<dyn CriteriaStore>,
        log: Arc<dyn DeliveryLog>,
        gateway: Arc<dyn NotificationGateway>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            log,
            gateway,
            config,
        }
    }

    /// Run one matching pass for one listing.
    ///
    /// A listing that is not publicly visible is a no-op: no searches
    /// are loaded, nothing is evaluated, the summary is empty. This is
    /// re-checked here regardless of what the caller already verified.
    pub async fn dispatch(&self, listing: &Listing) -> Result<DispatchSummary, DispatchError> {
        let mut summary = DispatchSummary::default();

        if !listing.visible {
            tracing::debug!(listing_id = listing.id, "Listing not publicly visible, alert pass skipped");
            return Ok(summary);
        }

        let searches = self.store.list_active().await.map_err(DispatchError::Store)?;
        summary.evaluated = searches.len();

        let mut deliveries = Vec::new();
        for active in &searches {
            if !matching::matches(listing, &active.search.conditions) {
                continue;
            }
            summary.matched += 1;

            let notice = MatchNotice::new(&active.search, listing);
            for channel in &active.search.channels {
                deliveries.push(self.deliver(active, channel, listing, notice.clone()));
            }
        }

        let outcomes = futures::stream::iter(deliveries)
            .buffer_unordered(self.config.send_concurrency)
            .collect::<Vec<_>>()
            .await;

        for outcome in outcomes {
            match outcome {
                SendResult::Sent => {
                    summary.attempted += 1;
                    summary.sent += 1;
                }
                SendResult::Failed => {
                    summary.attempted += 1;
                    summary.failed += 1;
                }
                SendResult::Duplicate => summary.skipped += 1,
            }
        }

        tracing::info!(
            listing_id = listing.id,
            evaluated = summary.evaluated,
            matched = summary.matched,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            "Alert pass complete"
        );
        Ok(summary)
    }

    /// One fan-out unit: record the attempt, send, record the outcome.
    async fn deliver(
        &self,
        active: &ActiveSearch,
        channel: &str,
        listing: &Listing,
        notice: MatchNotice,
    ) -> SendResult {
        let search = &active.search;

        let attempt_id = match self.log.begin(search.id, listing.id, channel).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!(
                    saved_search_id = search.id,
                    listing_id = listing.id,
                    channel,
                    "Attempt already recorded, skipping duplicate delivery"
                );
                return SendResult::Duplicate;
            }
            Err(e) => {
                tracing::error!(
                    saved_search_id = search.id,
                    listing_id = listing.id,
                    channel,
                    error = %e,
                    "Failed to record delivery attempt"
                );
                return SendResult::Failed;
            }
        };

        let outcome = match active.contact.recipient_for(channel) {
            None => AttemptOutcome::Failed(format!(
                "no {channel} recipient configured for subscriber {}",
                search.owner_id
            )),
            Some(recipient) => {
                let send = self.gateway.send(channel, recipient, &notice);
                match tokio::time::timeout(self.config.send_timeout, send).await {
                    Ok(Ok(())) => AttemptOutcome::Sent,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            saved_search_id = search.id,
                            listing_id = listing.id,
                            channel,
                            error = %e,
                            "Notification send failed"
                        );
                        AttemptOutcome::Failed(e.to_string())
                    }
                    Err(_) => {
                        tracing::warn!(
                            saved_search_id = search.id,
                            listing_id = listing.id,
                            channel,
                            timeout_ms = self.config.send_timeout.as_millis() as u64,
                            "Notification send timed out"
                        );
                        AttemptOutcome::Failed(format!(
                            "send timed out after {} ms",
                            self.config.send_timeout.as_millis()
                        ))
                    }
                }
            }
        };

        let result = match &outcome {
            AttemptOutcome::Sent => SendResult::Sent,
            AttemptOutcome::Failed(_) => SendResult::Failed,
        };

        if let Err(e) = self.log.complete(attempt_id, outcome).await {
            tracing::error!(attempt_id, error = %e, "Failed to record delivery outcome");
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use hestia_core::channels::{CHANNEL_EMAIL, CHANNEL_TELEGRAM, CHANNEL_WHATSAPP};
    use hestia_core::criteria::{Conditions, RangeFilter, SavedSearch};
    use hestia_core::delivery::DeliveryStatus;
    use hestia_core::listing::{PropertyType, TransactionKind};
    use hestia_core::subscriber::SubscriberContact;
    use hestia_core::types::DbId;
    use uuid::Uuid;

    use super::*;
    use crate::gateway::{chat::ChatError, GatewayError};

    // -- fakes ---------------------------------------------------------------

    struct StaticStore {
        searches: Vec<ActiveSearch>,
        calls: AtomicUsize,
    }

    impl StaticStore {
        fn new(searches: Vec<ActiveSearch>) -> Self {
            Self {
                searches,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CriteriaStore for StaticStore {
        async fn list_active(&self) -> Result<Vec<ActiveSearch>, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.searches.clone())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl CriteriaStore for FailingStore {
        async fn list_active(&self) -> Result<Vec<ActiveSearch>, BoxError> {
            Err("connection refused".into())
        }
    }

    #[derive(Debug, Clone)]
    struct LoggedAttempt {
        status: DeliveryStatus,
        error: Option<String>,
    }

    /// In-memory delivery log enforcing the table's uniqueness
    /// constraint on (search, listing, channel).
    #[derive(Default)]
    struct MemoryLog {
        next_id: AtomicI64,
        rows: Mutex<HashMap<(DbId, DbId, String), (DbId, LoggedAttempt)>>,
    }

    impl MemoryLog {
        fn attempts(&self) -> Vec<LoggedAttempt> {
            self.rows.lock().unwrap().values().map(|(_, a)| a.clone()).collect()
        }

        fn attempt_for(&self, search_id: DbId, listing_id: DbId, channel: &str) -> LoggedAttempt {
            self.rows
                .lock()
                .unwrap()
                .get(&(search_id, listing_id, channel.to_string()))
                .map(|(_, a)| a.clone())
                .expect("attempt row should exist")
        }
    }

    #[async_trait]
    impl DeliveryLog for MemoryLog {
        async fn begin(
            &self,
            saved_search_id: DbId,
            listing_id: DbId,
            channel: &str,
        ) -> Result<Option<DbId>, BoxError> {
            let mut rows = self.rows.lock().unwrap();
            let key = (saved_search_id, listing_id, channel.to_string());
            if rows.contains_key(&key) {
                return Ok(None);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            rows.insert(
                key,
                (
                    id,
                    LoggedAttempt {
                        status: DeliveryStatus::Pending,
                        error: None,
                    },
                ),
            );
            Ok(Some(id))
        }

        async fn complete(&self, attempt_id: DbId, outcome: AttemptOutcome) -> Result<(), BoxError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .values_mut()
                .find(|(id, _)| *id == attempt_id)
                .expect("completing an attempt that was never begun");
            assert_eq!(row.1.status, DeliveryStatus::Pending, "attempt completed twice");
            match outcome {
                AttemptOutcome::Sent => row.1.status = DeliveryStatus::Sent,
                AttemptOutcome::Failed(reason) => {
                    row.1.status = DeliveryStatus::Failed;
                    row.1.error = Some(reason);
                }
            }
            Ok(())
        }
    }

    /// Gateway that fails configured channels and optionally hangs.
    #[derive(Default)]
    struct ScriptedGateway {
        fail_channels: HashSet<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NotificationGateway for ScriptedGateway {
        async fn send(
            &self,
            channel: &str,
            _recipient: &str,
            _notice: &MatchNotice,
        ) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_channels.contains(channel) {
                return Err(GatewayError::Chat(ChatError::HttpStatus(502)));
            }
            Ok(())
        }
    }

    // -- helpers -------------------------------------------------------------

    fn listing() -> Listing {
        Listing {
            id: 77,
            public_id: Uuid::new_v4(),
            title: "Townhouse near the marina".to_string(),
            property_type: PropertyType::Townhouse,
            transaction: TransactionKind::Sale,
            region_id: 2,
            price_sale: Some(430_000),
            price_rent: None,
            bedrooms: Some(3),
            bathrooms: Some(2),
            area_sqm: Some(150),
            features: BTreeSet::new(),
            visible: true,
        }
    }

    fn contact() -> SubscriberContact {
        SubscriberContact {
            email: "buyer@example.com".to_string(),
            telegram_chat_id: Some("100200".to_string()),
            whatsapp_number: None,
        }
    }

    fn search(id: DbId, channels: &[&str], conditions: Conditions) -> ActiveSearch {
        ActiveSearch {
            search: SavedSearch::new(
                id,
                id * 10,
                format!("search-{id}"),
                conditions,
                channels.iter().map(|c| c.to_string()).collect(),
            )
            .unwrap(),
            contact: contact(),
        }
    }

    fn match_all() -> Conditions {
        Conditions::default()
    }

    fn match_nothing() -> Conditions {
        Conditions {
            price: Some(RangeFilter {
                min: Some(10_000_000),
                max: None,
            }),
            ..Default::default()
        }
    }

    fn dispatcher(
        store: Arc<dyn CriteriaStore>,
        log: Arc<MemoryLog>,
        gateway: Arc<ScriptedGateway>,
    ) -> AlertDispatcher {
        AlertDispatcher::new(store, log, gateway, DispatcherConfig::default())
    }

    // -- tests ---------------------------------------------------------------

    #[tokio::test]
    async fn invisible_listing_is_a_noop() {
        let store = Arc::new(StaticStore::new(vec![search(1, &[CHANNEL_EMAIL], match_all())]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let dispatcher = dispatcher(store.clone(), log.clone(), gateway.clone());

        let mut draft = listing();
        draft.visible = false;
        let summary = dispatcher.dispatch(&draft).await.unwrap();

        assert_eq!(summary, DispatchSummary::default());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0, "store must not be queried");
        assert!(log.attempts().is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fan_out_creates_one_attempt_per_matching_channel() {
        // Search 1 matches on two channels, search 2 on one, search 3
        // does not match; the email sends fail.
        let store = Arc::new(StaticStore::new(vec![
            search(1, &[CHANNEL_EMAIL, CHANNEL_TELEGRAM], match_all()),
            search(2, &[CHANNEL_EMAIL], match_all()),
            search(3, &[CHANNEL_TELEGRAM], match_nothing()),
        ]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway {
            fail_channels: HashSet::from([CHANNEL_EMAIL.to_string()]),
            ..Default::default()
        });
        let dispatcher = dispatcher(store, log.clone(), gateway);

        let summary = dispatcher.dispatch(&listing()).await.unwrap();

        assert_eq!(summary.evaluated, 3);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 0);

        // Attempt rows exist for every matching pair, failures included.
        assert_eq!(log.attempts().len(), 3);
        assert_eq!(
            log.attempt_for(1, 77, CHANNEL_EMAIL).status,
            DeliveryStatus::Failed
        );
        assert_eq!(
            log.attempt_for(1, 77, CHANNEL_TELEGRAM).status,
            DeliveryStatus::Sent
        );
        assert_eq!(
            log.attempt_for(2, 77, CHANNEL_EMAIL).status,
            DeliveryStatus::Failed
        );
    }

    #[tokio::test]
    async fn redelivered_listing_does_not_duplicate_attempts() {
        let store = Arc::new(StaticStore::new(vec![search(
            1,
            &[CHANNEL_EMAIL, CHANNEL_TELEGRAM],
            match_all(),
        )]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let dispatcher = dispatcher(store, log.clone(), gateway.clone());

        let first = dispatcher.dispatch(&listing()).await.unwrap();
        assert_eq!(first.attempted, 2);
        assert_eq!(first.sent, 2);

        let second = dispatcher.dispatch(&listing()).await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(second.sent, 0);
        assert_eq!(second.skipped, 2);

        // No duplicate rows, no second round of gateway calls.
        assert_eq!(log.attempts().len(), 2);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_gateway_send_is_failed_not_left_pending() {
        let store = Arc::new(StaticStore::new(vec![search(1, &[CHANNEL_EMAIL], match_all())]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let dispatcher = AlertDispatcher::new(
            store,
            log.clone(),
            gateway,
            DispatcherConfig {
                send_timeout: Duration::from_millis(10),
                ..Default::default()
            },
        );

        let summary = dispatcher.dispatch(&listing()).await.unwrap();

        assert_eq!(summary.failed, 1);
        let attempt = log.attempt_for(1, 77, CHANNEL_EMAIL);
        assert_eq!(attempt.status, DeliveryStatus::Failed);
        assert!(attempt.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn missing_recipient_fails_without_calling_the_gateway() {
        // The contact has no WhatsApp number linked.
        let store = Arc::new(StaticStore::new(vec![search(1, &[CHANNEL_WHATSAPP], match_all())]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let dispatcher = dispatcher(store, log.clone(), gateway.clone());

        let summary = dispatcher.dispatch(&listing()).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        let attempt = log.attempt_for(1, 77, CHANNEL_WHATSAPP);
        assert_eq!(attempt.status, DeliveryStatus::Failed);
        assert!(attempt.error.unwrap().contains("no whatsapp recipient"));
    }

    #[tokio::test]
    async fn store_failure_aborts_the_dispatch() {
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let dispatcher = dispatcher(Arc::new(FailingStore), log.clone(), gateway);

        let err = dispatcher.dispatch(&listing()).await.unwrap_err();
        assert_matches!(err, DispatchError::Store(_));
        assert!(log.attempts().is_empty());
    }

    #[tokio::test]
    async fn non_matching_searches_produce_no_attempts() {
        let store = Arc::new(StaticStore::new(vec![
            search(1, &[CHANNEL_EMAIL], match_nothing()),
            search(2, &[CHANNEL_TELEGRAM], match_nothing()),
        ]));
        let log = Arc::new(MemoryLog::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let dispatcher = dispatcher(store, log.clone(), gateway.clone());

        let summary = dispatcher.dispatch(&listing()).await.unwrap();

        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.attempted, 0);
        assert!(log.attempts().is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }
}
