use std::sync::Arc;

use ledger_bus::TransactionReversed;
use ledger_core::{
    Clock, IdGen, LedgerEntry, LedgerError, LedgerTransaction, OutboxRecord, OutboxStatus,
    TransactionId, TransactionStatus, TransactionWithEntries, validate_entries,
};
use ledger_store::{LedgerStore, StoreError};

use crate::{EngineResult, map_store_err};

/// Builds and posts the mirror transaction for a previously posted one.
pub struct Reverser {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
}

impl Reverser {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGen>) -> Self {
        Self { store, clock, ids }
    }

    pub async fn reverse(
        &self,
        original_id: &TransactionId,
        reversal_external_id: String,
    ) -> EngineResult<TransactionWithEntries> {
        if let Some(existing) = self
            .store
            .find_transaction_by_external_id(&reversal_external_id)
            .await
            .map_err(map_store_err)?
        {
            return Ok(existing);
        }

        let original = self
            .store
            .get_transaction(original_id)
            .await
            .map_err(map_store_err)?;

        if original.transaction.status != TransactionStatus::Posted {
            return Err(LedgerError::NotReversible(original_id.clone()));
        }

        let now = self.clock.now();
        let reversal_id = self.ids.next_id();

        let mirrored: Vec<LedgerEntry> = original
            .entries
            .iter()
            .map(|entry| LedgerEntry {
                id: self.ids.next_id(),
                transaction_id: reversal_id.clone(),
                account_id: entry.account_id.clone(),
                amount: entry.amount.clone(),
                side: entry.side.flip(),
                event_category: ledger_core::EventCategory::Reversal,
                event_time: now,
                recorded_at: now,
            })
            .collect();

        validate_entries(&mirrored)?;

        let reversal = LedgerTransaction {
            id: reversal_id.clone(),
            external_id: reversal_external_id.clone(),
            event_category: ledger_core::EventCategory::Reversal,
            status: TransactionStatus::Posted,
            created_at: now,
            reversing_transaction_id: None,
        };

        let payload = TransactionReversed::from_transaction(&reversal, original_id, now);
        let payload_bytes = serde_json::to_vec(&payload)
            .map_err(|e| LedgerError::Internal(format!("failed to serialize outbox payload: {e}")))?;

        let outbox = OutboxRecord {
            id: self.ids.next_id(),
            aggregate_id: reversal_id,
            event_type: ledger_core::EVENT_TYPE_TRANSACTION_REVERSED.to_string(),
            payload: payload_bytes,
            created_at: now,
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        };

        match self.store.post_reversal(original_id, reversal, mirrored, outbox).await {
            Ok(result) => Ok(result),
            Err(StoreError::DuplicateExternalId(id)) => self
                .store
                .find_transaction_by_external_id(&reversal_external_id)
                .await
                .map_err(map_store_err)?
                .ok_or(LedgerError::DuplicateExternalId(id)),
            Err(err) => Err(map_store_err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Account, AccountStatus, AccountType, EntrySide, EventCategory, FixedClock, Money, UuidGen};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    async fn setup() -> (Arc<InMemoryLedgerStore>, Reverser, TransactionId) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let ids = Arc::new(UuidGen);

        use ledger_store::LedgerStore;
        store
            .create_account(Account {
                id: "a".into(),
                account_type: AccountType::Asset,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: chrono::Utc::now(),
            })
            .await
            .expect("create a");
        store
            .create_account(Account {
                id: "c".into(),
                account_type: AccountType::Asset,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: chrono::Utc::now(),
            })
            .await
            .expect("create c");

        let original = LedgerTransaction {
            id: "t2".into(),
            external_id: "x2".into(),
            event_category: EventCategory::Transfer,
            status: TransactionStatus::Posted,
            created_at: chrono::Utc::now(),
            reversing_transaction_id: None,
        };
        let entries = vec![
            LedgerEntry {
                id: "e1".into(),
                transaction_id: "t2".into(),
                account_id: "a".into(),
                amount: Money::new(dec!(30), "BRL"),
                side: EntrySide::Credit,
                event_category: EventCategory::Transfer,
                event_time: chrono::Utc::now(),
                recorded_at: chrono::Utc::now(),
            },
            LedgerEntry {
                id: "e2".into(),
                transaction_id: "t2".into(),
                account_id: "c".into(),
                amount: Money::new(dec!(30), "BRL"),
                side: EntrySide::Debit,
                event_category: EventCategory::Transfer,
                event_time: chrono::Utc::now(),
                recorded_at: chrono::Utc::now(),
            },
        ];
        let outbox = OutboxRecord {
            id: "ob1".into(),
            aggregate_id: "t2".into(),
            event_type: "TRANSACTION_POSTED".into(),
            payload: vec![],
            created_at: chrono::Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        };
        store
            .post_transaction(original, entries, outbox)
            .await
            .expect("seed original");

        let reverser = Reverser::new(store.clone(), clock, ids);
        (store, reverser, "t2".into())
    }

    #[tokio::test]
    async fn reverses_posted_transaction() {
        let (store, reverser, original_id) = setup().await;
        let reversal = reverser
            .reverse(&original_id, "r2".into())
            .await
            .expect("reverse");

        assert_eq!(reversal.transaction.event_category, ledger_core::EventCategory::Reversal);
        assert_eq!(reversal.entries.len(), 2);

        use ledger_store::LedgerStore;
        let original = store.get_transaction(&original_id).await.expect("get original");
        assert_eq!(original.transaction.status, TransactionStatus::Reversed);
        assert_eq!(original.transaction.reversing_transaction_id, Some(reversal.transaction.id));
    }

    #[tokio::test]
    async fn reversal_is_idempotent() {
        let (_store, reverser, original_id) = setup().await;
        let first = reverser.reverse(&original_id, "r2".into()).await.expect("first reverse");
        let second = reverser.reverse(&original_id, "r2".into()).await.expect("second reverse");
        assert_eq!(first.transaction.id, second.transaction.id);
    }

    #[tokio::test]
    async fn rejects_reversal_of_non_posted_transaction() {
        let (_store, reverser, original_id) = setup().await;
        reverser.reverse(&original_id, "r2".into()).await.expect("first reverse");

        let err = reverser.reverse(&original_id, "r3".into()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotReversible(_)));
    }
}
