//! The outbox relay: forwards captured events to the message bus.

use std::collections::HashSet;

use chrono::Utc;
use domain::DeliveryEvent;
use store::{DeliveryStore, OutboxRecord, StoreError};

use crate::error::Result;
use crate::integration::OrderStatusChanged;
use crate::publisher::EventPublisher;

/// Default number of outbox rows relayed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default topic for order status changes.
pub const DEFAULT_TOPIC: &str = "order.status.changed";

/// Relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub batch_size: usize,
    pub topic: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }
}

/// What one relay batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Rows published and marked processed.
    pub published: usize,
    /// Rows whose publish or mark failed; left pending.
    pub failed: usize,
    /// Rows held back because an earlier row of the same aggregate failed.
    pub deferred: usize,
    /// Rows whose content could not be read; left pending.
    pub malformed: usize,
}

enum RowOutcome {
    Published,
    Failed,
    Deferred,
    Malformed,
}

/// Forwards pending outbox rows to the message bus, oldest first.
///
/// Delivery is at-least-once: a row is marked processed only after the bus
/// acknowledged it, and anything left pending is retried by the next batch.
/// Within a batch, once a row fails the later rows of the same aggregate
/// are held back so each aggregate's events stay in raise order.
pub struct OutboxRelay<S, P> {
    store: S,
    publisher: P,
    config: RelayConfig,
}

impl<S, P> OutboxRelay<S, P>
where
    S: DeliveryStore,
    P: EventPublisher,
{
    /// Creates a new relay.
    pub fn new(store: S, publisher: P, config: RelayConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relays one batch of pending rows.
    ///
    /// Publishes up to `batch_size` rows. Rows that fail stay pending and
    /// the relay pages past them by position, so a run of failing rows at
    /// the head of the outbox never hides the rows behind it.
    ///
    /// An unreachable bus or store aborts the batch; rows already published
    /// stay processed.
    #[tracing::instrument(skip(self), fields(topic = %self.config.topic))]
    pub async fn run_batch(&self) -> Result<RelayReport> {
        let mut report = RelayReport::default();
        let mut blocked: HashSet<(String, String)> = HashSet::new();
        let mut cursor = 0;

        while report.published < self.config.batch_size {
            let page = self
                .store
                .pending_outbox_after(cursor, self.config.batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.position;
            let exhausted = page.len() < self.config.batch_size;

            for record in page {
                if report.published == self.config.batch_size {
                    break;
                }
                match self.relay_record(&record, &mut blocked).await? {
                    RowOutcome::Published => report.published += 1,
                    RowOutcome::Failed => report.failed += 1,
                    RowOutcome::Deferred => report.deferred += 1,
                    RowOutcome::Malformed => report.malformed += 1,
                }
            }

            if exhausted {
                break;
            }
        }

        Ok(report)
    }

    async fn relay_record(
        &self,
        record: &OutboxRecord,
        blocked: &mut HashSet<(String, String)>,
    ) -> Result<RowOutcome> {
        let aggregate = (record.aggregate_type.clone(), record.aggregate_id.clone());
        if blocked.contains(&aggregate) {
            return Ok(RowOutcome::Deferred);
        }

        let payload = match Self::payload(record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    event_id = %record.event_id,
                    event_type = %record.event_type,
                    error = %e,
                    "outbox row cannot be relayed"
                );
                blocked.insert(aggregate);
                return Ok(RowOutcome::Malformed);
            }
        };

        let key = record.event_id.to_string();
        if let Err(e) = self
            .publisher
            .publish(&self.config.topic, &key, &payload)
            .await
        {
            metrics::counter!("outbox_relay_failed_total").increment(1);
            if e.is_unavailable() {
                return Err(e.into());
            }
            tracing::warn!(event_id = %record.event_id, error = %e, "publish failed");
            blocked.insert(aggregate);
            return Ok(RowOutcome::Failed);
        }

        match self.store.mark_processed(record.event_id, Utc::now()).await {
            Ok(()) => {
                metrics::counter!("outbox_relay_published_total").increment(1);
                tracing::debug!(event_id = %record.event_id, "outbox row relayed");
                Ok(RowOutcome::Published)
            }
            Err(e) if e.is_infrastructure() => Err(e.into()),
            Err(e) => {
                // Published but still pending; consumers dedupe on the key.
                tracing::warn!(
                    event_id = %record.event_id,
                    error = %e,
                    "mark processed failed"
                );
                blocked.insert(aggregate);
                Ok(RowOutcome::Failed)
            }
        }
    }

    fn payload(record: &OutboxRecord) -> Result<Vec<u8>> {
        let event: DeliveryEvent = record.to_event()?;
        let payload = OrderStatusChanged::from(&event)
            .to_payload()
            .map_err(StoreError::Serialization)?;
        Ok(payload)
    }
}
