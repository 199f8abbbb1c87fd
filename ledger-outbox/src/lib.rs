#![deny(clippy::print_stdout, clippy::print_stderr)]

//! The outbox relay: polls `LedgerStore` for PENDING outbox rows and
//! publishes them through a `BusClient`, advancing each row to
//! PROCESSED or FAILED. Runs as a single long-lived background task;
//! see `RelayConfig` for the tunables.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledger_bus::{BusClient, BusTopics};
use ledger_core::{OutboxRecord, OutboxStatus};
use ledger_store::LedgerStore;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub health_log_interval: Duration,
    /// Upper bound on a single `BusClient::publish` call. A record that
    /// times out is treated exactly like a publish failure: it counts
    /// against `max_attempts` and is retried on the next poll.
    pub per_attempt_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            batch_size: 100,
            max_attempts: 5,
            health_log_interval: Duration::from_millis(60_000),
            per_attempt_timeout: Duration::from_millis(2000),
        }
    }
}

/// Per-record outcome, surfaced for tests and for the run loop's own
/// logging; not part of the public wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Processed,
    RetriedPending,
    Failed,
}

pub struct OutboxRelay {
    store: Arc<dyn LedgerStore>,
    bus: Arc<dyn BusClient>,
    topics: BusTopics,
    config: RelayConfig,
}

impl OutboxRelay {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, bus: Arc<dyn BusClient>, config: RelayConfig) -> Self {
        Self { store, bus, topics: BusTopics::default(), config }
    }

    #[must_use]
    pub fn with_topics(mut self, topics: BusTopics) -> Self {
        self.topics = topics;
        self
    }

    fn topic_for(&self, event_type: &str) -> Option<&str> {
        match event_type {
            ledger_core::EVENT_TYPE_TRANSACTION_POSTED => Some(self.topics.posted.as_str()),
            ledger_core::EVENT_TYPE_TRANSACTION_REVERSED => Some(self.topics.reversed.as_str()),
            _ => None,
        }
    }

    /// Runs forever, polling at `config.poll_interval` and emitting a
    /// health log at `config.health_log_interval`. Intended to be
    /// `tokio::spawn`ed as a background task alongside the HTTP server.
    pub async fn run(&self) -> ! {
        let mut poll_ticker = tokio::time::interval(self.config.poll_interval);
        poll_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut health_ticker = tokio::time::interval(self.config.health_log_interval);
        health_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll_ticker.tick() => {
                    if let Err(err) = self.poll_once().await {
                        warn!(%err, "outbox poll cycle failed");
                    }
                }
                _ = health_ticker.tick() => {
                    self.log_health().await;
                }
            }
        }
    }

    /// A single poll-publish cycle. Exposed separately from `run` so
    /// tests can drive it deterministically without waiting on timers.
    pub async fn poll_once(&self) -> Result<Vec<PublishOutcome>, ledger_store::StoreError> {
        let batch = self.store.fetch_pending_outbox(self.config.batch_size).await?;
        let mut outcomes = Vec::with_capacity(batch.len());
        for record in batch {
            outcomes.push(self.publish_one(record).await?);
        }
        Ok(outcomes)
    }

    async fn publish_one(&self, record: OutboxRecord) -> Result<PublishOutcome, ledger_store::StoreError> {
        let Some(topic) = self.topic_for(&record.event_type) else {
            warn!(event_type = %record.event_type, id = %record.id, "unknown outbox event type, marking failed");
            self.store
                .mark_outbox_attempt_failed(&record.id, format!("unknown event type {}", record.event_type), 0)
                .await?;
            return Ok(PublishOutcome::Failed);
        };

        let outcome = tokio::time::timeout(
            self.config.per_attempt_timeout,
            self.bus.publish(topic, &record.aggregate_id, &record.payload),
        )
        .await;

        let error = match outcome {
            Ok(Ok(())) => {
                self.store.mark_outbox_processed(&record.id, Utc::now()).await?;
                info!(id = %record.id, %topic, "outbox record published");
                return Ok(PublishOutcome::Processed);
            }
            Ok(Err(err)) => err.to_string(),
            Err(_elapsed) => format!("publish timed out after {:?}", self.config.per_attempt_timeout),
        };

        self.store
            .mark_outbox_attempt_failed(&record.id, error.clone(), self.config.max_attempts)
            .await?;
        if record.attempts + 1 >= self.config.max_attempts {
            warn!(id = %record.id, %error, "outbox record failed permanently");
            Ok(PublishOutcome::Failed)
        } else {
            warn!(id = %record.id, %error, "outbox publish failed, will retry");
            Ok(PublishOutcome::RetriedPending)
        }
    }

    async fn log_health(&self) {
        match self.store.count_outbox_by_status().await {
            Ok(health) => {
                info!(pending = health.pending, processed = health.processed, failed = health.failed, "outbox health");
                if health.failed > 0 {
                    warn!(failed = health.failed, "outbox has permanently failed records awaiting operator action");
                }
            }
            Err(err) => warn!(%err, "failed to collect outbox health metrics"),
        }
    }
}
