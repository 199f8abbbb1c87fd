use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::{
    Account, AccountId, AccountStatus, BalanceSnapshot, LedgerEntry, LedgerTransaction, OutboxId,
    OutboxRecord, OutboxStatus, TransactionId, TransactionStatus, TransactionWithEntries,
};
use tokio::sync::Mutex;

use crate::{LedgerStore, OutboxHealth, StoreError, StoreResult};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
    entries: Vec<LedgerEntry>,
    external_ids: HashMap<String, TransactionId>,
    snapshots: Vec<BalanceSnapshot>,
    outbox: HashMap<OutboxId, OutboxRecord>,
}

impl State {
    fn entries_for(&self, transaction_id: &TransactionId) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| &e.transaction_id == transaction_id)
            .cloned()
            .collect()
    }

    fn transaction_with_entries(&self, id: &TransactionId) -> Option<TransactionWithEntries> {
        self.transactions.get(id).map(|txn| TransactionWithEntries {
            transaction: txn.clone(),
            entries: self.entries_for(id),
        })
    }
}

/// Single-process reference store backed by a `tokio::sync::Mutex`
/// guarded `HashMap`s, used in unit and contract tests where a real
/// database is unavailable or undesirable.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_account(&self, account: Account) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: &AccountId) -> StoreResult<Account> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn update_account_status(
        &self,
        id: &AccountId,
        next: AccountStatus,
    ) -> StoreResult<Account> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;
        if !account.status.can_transition_to(next) {
            return Err(StoreError::InvalidAccountStateTransition(format!(
                "{:?} -> {:?}",
                account.status, next
            )));
        }
        account.status = next;
        Ok(account.clone())
    }

    async fn find_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<TransactionWithEntries>> {
        let state = self.state.lock().await;
        let Some(id) = state.external_ids.get(external_id) else {
            return Ok(None);
        };
        Ok(state.transaction_with_entries(id))
    }

    async fn get_transaction(&self, id: &TransactionId) -> StoreResult<TransactionWithEntries> {
        let state = self.state.lock().await;
        state
            .transaction_with_entries(id)
            .ok_or_else(|| StoreError::TransactionNotFound(id.clone()))
    }

    async fn post_transaction(
        &self,
        transaction: LedgerTransaction,
        entries: Vec<LedgerEntry>,
        outbox: OutboxRecord,
    ) -> StoreResult<TransactionWithEntries> {
        let mut state = self.state.lock().await;
        if state.external_ids.contains_key(&transaction.external_id) {
            return Err(StoreError::DuplicateExternalId(
                transaction.external_id.clone(),
            ));
        }
        for entry in &entries {
            let account = state
                .accounts
                .get(&entry.account_id)
                .ok_or_else(|| StoreError::AccountNotFound(entry.account_id.clone()))?;
            if account.status != AccountStatus::Active {
                return Err(StoreError::InvalidAccountStateTransition(format!(
                    "account {} is not active",
                    entry.account_id
                )));
            }
        }

        state
            .external_ids
            .insert(transaction.external_id.clone(), transaction.id.clone());
        state.transactions.insert(transaction.id.clone(), transaction.clone());
        state.entries.extend(entries.clone());
        state.outbox.insert(outbox.id.clone(), outbox);

        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    async fn post_reversal(
        &self,
        original_id: &TransactionId,
        transaction: LedgerTransaction,
        entries: Vec<LedgerEntry>,
        outbox: OutboxRecord,
    ) -> StoreResult<TransactionWithEntries> {
        let mut state = self.state.lock().await;
        if state.external_ids.contains_key(&transaction.external_id) {
            return Err(StoreError::DuplicateExternalId(
                transaction.external_id.clone(),
            ));
        }
        {
            let original = state
                .transactions
                .get(original_id)
                .ok_or_else(|| StoreError::TransactionNotFound(original_id.clone()))?;
            if original.status != TransactionStatus::Posted {
                return Err(StoreError::InvalidAccountStateTransition(format!(
                    "transaction {original_id} is not POSTED"
                )));
            }
        }
        for entry in &entries {
            let account = state
                .accounts
                .get(&entry.account_id)
                .ok_or_else(|| StoreError::AccountNotFound(entry.account_id.clone()))?;
            if account.status != AccountStatus::Active {
                return Err(StoreError::InvalidAccountStateTransition(format!(
                    "account {} is not active",
                    entry.account_id
                )));
            }
        }

        state
            .external_ids
            .insert(transaction.external_id.clone(), transaction.id.clone());
        state.transactions.insert(transaction.id.clone(), transaction.clone());
        state.entries.extend(entries.clone());
        state.outbox.insert(outbox.id.clone(), outbox);

        if let Some(original) = state.transactions.get_mut(original_id) {
            original.status = TransactionStatus::Reversed;
            original.reversing_transaction_id = Some(transaction.id.clone());
        }

        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    async fn find_entries(
        &self,
        account_id: &AccountId,
        after: Option<DateTime<Utc>>,
        at_or_before: DateTime<Utc>,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        let mut matching: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| &e.account_id == account_id)
            .filter(|e| state.transactions.get(&e.transaction_id).is_some_and(|t| t.status == TransactionStatus::Posted))
            .filter(|e| after.is_none_or(|a| e.event_time > a))
            .filter(|e| e.event_time <= at_or_before)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.event_time);
        Ok(matching)
    }

    async fn find_latest_snapshot(
        &self,
        account_id: &AccountId,
        at_or_before: DateTime<Utc>,
    ) -> StoreResult<Option<BalanceSnapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .iter()
            .filter(|s| &s.account_id == account_id && s.snapshot_time <= at_or_before)
            .max_by_key(|s| s.snapshot_time)
            .cloned())
    }

    async fn persist_snapshot(&self, snapshot: BalanceSnapshot) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let exists = state
            .snapshots
            .iter()
            .any(|s| s.account_id == snapshot.account_id && s.snapshot_time == snapshot.snapshot_time);
        if exists {
            return Err(StoreError::Storage(format!(
                "snapshot already exists for account {} at {}",
                snapshot.account_id, snapshot.snapshot_time
            )));
        }
        state.snapshots.push(snapshot);
        Ok(())
    }

    async fn fetch_pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxRecord>> {
        let state = self.state.lock().await;
        let mut pending: Vec<OutboxRecord> = state
            .outbox
            .values()
            .filter(|r| r.status == OutboxStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_outbox_processed(
        &self,
        id: &OutboxId,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .outbox
            .get_mut(id)
            .ok_or_else(|| StoreError::Storage(format!("outbox record {id} not found")))?;
        record.status = OutboxStatus::Processed;
        record.processed_at = Some(processed_at);
        Ok(())
    }

    async fn mark_outbox_attempt_failed(
        &self,
        id: &OutboxId,
        error: String,
        max_attempts: u32,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .outbox
            .get_mut(id)
            .ok_or_else(|| StoreError::Storage(format!("outbox record {id} not found")))?;
        record.attempts += 1;
        record.last_error = Some(error);
        if record.attempts >= max_attempts {
            record.status = OutboxStatus::Failed;
        }
        Ok(())
    }

    async fn count_outbox_by_status(&self) -> StoreResult<OutboxHealth> {
        let state = self.state.lock().await;
        let mut health = OutboxHealth::default();
        for record in state.outbox.values() {
            match record.status {
                OutboxStatus::Pending => health.pending += 1,
                OutboxStatus::Processed => health.processed += 1,
                OutboxStatus::Failed => health.failed += 1,
            }
        }
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_core::{EntrySide, EventCategory, Money};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn active_account(id: &str) -> Account {
        Account {
            id: id.into(),
            account_type: ledger_core::AccountType::Asset,
            currency: "BRL".into(),
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn entry(txn: &str, account: &str, side: EntrySide) -> LedgerEntry {
        LedgerEntry {
            id: format!("entry-{account}-{side:?}"),
            transaction_id: txn.into(),
            account_id: account.into(),
            amount: Money::new(dec!(100), "BRL"),
            side,
            event_category: EventCategory::Deposit,
            event_time: Utc::now(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn posts_and_finds_by_external_id() {
        let store = InMemoryLedgerStore::new();
        store.create_account(active_account("a")).await.expect("create a");
        store.create_account(active_account("b")).await.expect("create b");

        let txn = LedgerTransaction {
            id: "t1".into(),
            external_id: "x1".into(),
            event_category: EventCategory::Deposit,
            status: TransactionStatus::Posted,
            created_at: Utc::now(),
            reversing_transaction_id: None,
        };
        let entries = vec![entry("t1", "a", EntrySide::Debit), entry("t1", "b", EntrySide::Credit)];
        let outbox = OutboxRecord {
            id: "ob1".into(),
            aggregate_id: "t1".into(),
            event_type: "TRANSACTION_POSTED".into(),
            payload: vec![],
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        };

        store
            .post_transaction(txn.clone(), entries, outbox)
            .await
            .expect("post");

        let found = store
            .find_transaction_by_external_id("x1")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.transaction.id, "t1");
        assert_eq!(found.entries.len(), 2);
    }

    #[tokio::test]
    async fn rejects_duplicate_external_id() {
        let store = InMemoryLedgerStore::new();
        store.create_account(active_account("a")).await.expect("create a");
        store.create_account(active_account("b")).await.expect("create b");

        let make_txn = |id: &str| LedgerTransaction {
            id: id.into(),
            external_id: "dup".into(),
            event_category: EventCategory::Deposit,
            status: TransactionStatus::Posted,
            created_at: Utc::now(),
            reversing_transaction_id: None,
        };
        let outbox = |id: &str, aggregate: &str| OutboxRecord {
            id: id.into(),
            aggregate_id: aggregate.into(),
            event_type: "TRANSACTION_POSTED".into(),
            payload: vec![],
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: OutboxStatus::Pending,
        };

        store
            .post_transaction(
                make_txn("t1"),
                vec![entry("t1", "a", EntrySide::Debit), entry("t1", "b", EntrySide::Credit)],
                outbox("ob1", "t1"),
            )
            .await
            .expect("first post");

        let err = store
            .post_transaction(
                make_txn("t2"),
                vec![entry("t2", "a", EntrySide::Debit), entry("t2", "b", EntrySide::Credit)],
                outbox("ob2", "t2"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateExternalId(_)));
    }

    #[tokio::test]
    async fn fetch_pending_outbox_is_oldest_first() {
        let store = InMemoryLedgerStore::new();
        let mut state = store.state.lock().await;
        for i in 0..3 {
            state.outbox.insert(
                format!("ob{i}"),
                OutboxRecord {
                    id: format!("ob{i}"),
                    aggregate_id: format!("t{i}"),
                    event_type: "TRANSACTION_POSTED".into(),
                    payload: vec![],
                    created_at: Utc::now() - chrono::Duration::seconds(3 - i),
                    processed_at: None,
                    attempts: 0,
                    last_error: None,
                    status: OutboxStatus::Pending,
                },
            );
        }
        drop(state);

        let batch = store.fetch_pending_outbox(2).await.expect("fetch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, "ob0");
        assert_eq!(batch[1].id, "ob1");
    }
}
