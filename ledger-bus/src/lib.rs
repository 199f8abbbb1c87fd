#![deny(clippy::print_stdout, clippy::print_stderr)]

//! The external message bus contract: wire payload shapes for the two
//! outbox event types, and the `BusClient` trait implementations
//! publish through. Production wiring supplies a real client; tests
//! use the in-memory or always-failing doubles below.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::{EntrySide, LedgerTransaction, TransactionWithEntries};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedEntryPayload {
    pub account_id: String,
    /// Decimal amount rendered as a string so no precision is lost in
    /// transit.
    pub amount: String,
    pub currency: String,
    pub side: EntrySide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPosted {
    pub transaction_id: String,
    pub external_id: String,
    pub event_type: String,
    pub entries: Vec<PostedEntryPayload>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionPosted {
    #[must_use]
    pub fn from_transaction(txn_with_entries: &TransactionWithEntries, timestamp: DateTime<Utc>) -> Self {
        Self {
            transaction_id: txn_with_entries.transaction.id.clone(),
            external_id: txn_with_entries.transaction.external_id.clone(),
            event_type: ledger_core::EVENT_TYPE_TRANSACTION_POSTED.to_string(),
            entries: txn_with_entries
                .entries
                .iter()
                .map(|e| PostedEntryPayload {
                    account_id: e.account_id.clone(),
                    amount: e.amount.amount().to_string(),
                    currency: e.amount.currency().to_string(),
                    side: e.side,
                })
                .collect(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReversed {
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TransactionReversed {
    #[must_use]
    pub fn from_transaction(reversal: &LedgerTransaction, original_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            transaction_id: reversal.id.clone(),
            original_transaction_id: original_id.to_string(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BusTopics {
    pub posted: String,
    pub reversed: String,
}

impl Default for BusTopics {
    fn default() -> Self {
        Self {
            posted: "transaction-posted".into(),
            reversed: "transaction-reversed".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// Asynchronous publish to a named topic with a partition key. The
/// core only ever learns success or failure; retry and
/// at-least-once semantics live in the outbox relay, not here.
#[async_trait]
pub trait BusClient: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BusError>;
}

#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Records every publish for assertions in tests.
#[derive(Default)]
pub struct InMemoryBusClient {
    deliveries: RwLock<Vec<DeliveredMessage>>,
}

impl InMemoryBusClient {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn deliveries(&self) -> Vec<DeliveredMessage> {
        self.deliveries.read().await.clone()
    }
}

#[async_trait]
impl BusClient for InMemoryBusClient {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BusError> {
        self.deliveries.write().await.push(DeliveredMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// Always fails, for exercising the outbox relay's retry/failure path.
#[derive(Default)]
pub struct FailingBusClient;

#[async_trait]
impl BusClient for FailingBusClient {
    async fn publish(&self, _topic: &str, _key: &str, _payload: &[u8]) -> Result<(), BusError> {
        Err(BusError::PublishFailed("bus unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn in_memory_bus_records_deliveries() {
        let bus = InMemoryBusClient::shared();
        bus.publish("transaction-posted", "t1", b"payload")
            .await
            .expect("publish");
        let deliveries = bus.deliveries().await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].key, "t1");
    }

    #[tokio::test]
    async fn failing_bus_always_errors() {
        let bus = FailingBusClient;
        let err = bus.publish("topic", "key", b"x").await.unwrap_err();
        assert!(matches!(err, BusError::PublishFailed(_)));
    }
}
