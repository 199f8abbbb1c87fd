use std::collections::HashSet;
use std::sync::Arc;

use ledger_bus::TransactionPosted;
use ledger_core::{
    AccountId, Clock, EntrySide, EventCategory, IdGen, LedgerEntry, LedgerError, LedgerTransaction,
    Money, OutboxRecord, OutboxStatus, TransactionStatus, TransactionWithEntries, validate_entries,
};
use ledger_store::{LedgerStore, StoreError};
use rust_decimal::Decimal;

use crate::{EngineResult, map_store_err};

#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub side: EntrySide,
}

#[derive(Debug, Clone)]
pub struct PostCommand {
    pub external_id: String,
    pub event_category: EventCategory,
    pub entries: Vec<EntryDraft>,
}

/// Idempotent, atomic creation of balanced multi-entry transactions.
pub struct LedgerPoster {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
}

impl LedgerPoster {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGen>) -> Self {
        Self { store, clock, ids }
    }

    pub async fn post(&self, command: PostCommand) -> EngineResult<TransactionWithEntries> {
        if let Some(existing) = self
            .store
            .find_transaction_by_external_id(&command.external_id)
            .await
            .map_err(map_store_err)?
        {
            return Ok(existing);
        }

        if command.entries.len() < 2 {
            return Err(LedgerError::TooFewEntries(command.entries.len()));
        }

        let mut seen_accounts = HashSet::new();
        for draft in &command.entries {
            if !seen_accounts.insert(draft.account_id.clone()) {
                continue;
            }
            let account = self
                .store
                .get_account(&draft.account_id)
                .await
                .map_err(map_store_err)?;
            if !account.is_active() {
                return Err(LedgerError::AccountNotActive(account.id));
            }
            let draft_currency = draft.currency.to_ascii_uppercase();
            if account.currency != draft_currency {
                return Err(LedgerError::CurrencyMismatch(format!(
                    "entry currency {draft_currency} does not match account {} currency {}",
                    account.id, account.currency
                )));
            }
        }

        let now = self.clock.now();
        let transaction_id = self.ids.next_id();

        let entries: Vec<LedgerEntry> = command
            .entries
            .iter()
            .map(|draft| LedgerEntry {
                id: self.ids.next_id(),
                transaction_id: transaction_id.clone(),
                account_id: draft.account_id.clone(),
                amount: Money::new(draft.amount, draft.currency.clone()),
                side: draft.side,
                event_category: command.event_category,
                event_time: now,
                recorded_at: now,
            })
            .collect();

        for entry in &entries {
            if !entry.amount.is_positive() {
                return Err(LedgerError::InvalidArg(format!(
                    "entry amount for account {} must be strictly positive",
                    entry.account_id
                )));
            }
        }

        validate_entries(&entries)?;

        let transaction = LedgerTransaction {
            id: transaction_id.clone(),
            external_id: command.external_id.clone(),
            event_category: command.event_category,
            status: TransactionStatus::Posted,
            created_at: now,
            reversing_transaction_id: None,
        };

        let posted = TransactionWithEntries {
            transaction: transaction.clone(),
            entries: entries.clone(),
        };
        let payload = TransactionPosted::from_transaction(&posted, now);
        let payload_bytes = serde_json::to_vec(&payload)
            .map_err(|e| LedgerError::Internal(format!("failed to serialize outbox payload: {e}")))?;

        let outbox = OutboxRecord {
            id: self.ids.next_id(),
            aggregate_id: transaction_id,
            event_type: ledger_core::EVENT_TYPE_TRANSACTION_POSTED.to_string(),
            payload: payload_bytes,
            created_at: now,
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        };

        match self.store.post_transaction(transaction, entries, outbox).await {
            Ok(result) => Ok(result),
            Err(StoreError::DuplicateExternalId(id)) => self
                .store
                .find_transaction_by_external_id(&command.external_id)
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
    use ledger_core::{Account, AccountStatus, AccountType, FixedClock, UuidGen};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn poster() -> (LedgerPoster, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let ids = Arc::new(UuidGen);
        (LedgerPoster::new(store.clone(), clock, ids), store)
    }

    async fn make_account(store: &InMemoryLedgerStore, id: &str, account_type: AccountType) {
        use ledger_store::LedgerStore;
        store
            .create_account(Account {
                id: id.into(),
                account_type,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: chrono::Utc::now(),
            })
            .await
            .expect("create account");
    }

    #[tokio::test]
    async fn posts_balanced_deposit() {
        let (poster, store) = poster();
        make_account(&store, "a", AccountType::Asset).await;
        make_account(&store, "b", AccountType::Liability).await;

        let result = poster
            .post(PostCommand {
                external_id: "x1".into(),
                event_category: EventCategory::Deposit,
                entries: vec![
                    EntryDraft {
                        account_id: "a".into(),
                        amount: dec!(100),
                        currency: "BRL".into(),
                        side: EntrySide::Debit,
                    },
                    EntryDraft {
                        account_id: "b".into(),
                        amount: dec!(100),
                        currency: "BRL".into(),
                        side: EntrySide::Credit,
                    },
                ],
            })
            .await
            .expect("post");

        assert_eq!(result.transaction.status, TransactionStatus::Posted);
        assert_eq!(result.entries.len(), 2);
    }

    #[tokio::test]
    async fn repeated_post_is_idempotent() {
        let (poster, store) = poster();
        make_account(&store, "a", AccountType::Asset).await;
        make_account(&store, "b", AccountType::Liability).await;

        let command = PostCommand {
            external_id: "x1".into(),
            event_category: EventCategory::Deposit,
            entries: vec![
                EntryDraft {
                    account_id: "a".into(),
                    amount: dec!(100),
                    currency: "BRL".into(),
                    side: EntrySide::Debit,
                },
                EntryDraft {
                    account_id: "b".into(),
                    amount: dec!(100),
                    currency: "BRL".into(),
                    side: EntrySide::Credit,
                },
            ],
        };

        let first = poster.post(command.clone()).await.expect("first post");
        let second = poster.post(command).await.expect("second post");
        assert_eq!(first.transaction.id, second.transaction.id);
    }

    #[tokio::test]
    async fn rejects_unbalanced_entries() {
        let (poster, store) = poster();
        make_account(&store, "a", AccountType::Asset).await;
        make_account(&store, "b", AccountType::Liability).await;

        let err = poster
            .post(PostCommand {
                external_id: "x4".into(),
                event_category: EventCategory::Transfer,
                entries: vec![
                    EntryDraft {
                        account_id: "a".into(),
                        amount: dec!(100),
                        currency: "BRL".into(),
                        side: EntrySide::Debit,
                    },
                    EntryDraft {
                        account_id: "b".into(),
                        amount: dec!(50),
                        currency: "BRL".into(),
                        side: EntrySide::Credit,
                    },
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unbalanced(_)));
    }

    #[tokio::test]
    async fn rejects_currency_mismatch() {
        let (poster, store) = poster();
        make_account(&store, "a", AccountType::Asset).await;
        make_account(&store, "b", AccountType::Liability).await;

        let err = poster
            .post(PostCommand {
                external_id: "x5".into(),
                event_category: EventCategory::Transfer,
                entries: vec![
                    EntryDraft {
                        account_id: "a".into(),
                        amount: dec!(10),
                        currency: "USD".into(),
                        side: EntrySide::Debit,
                    },
                    EntryDraft {
                        account_id: "b".into(),
                        amount: dec!(10),
                        currency: "USD".into(),
                        side: EntrySide::Credit,
                    },
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch(_)));
    }
}
