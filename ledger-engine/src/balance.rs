use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledger_core::{Account, AccountId, AccountType, EntrySide, LedgerEntry, Money};
use ledger_store::LedgerStore;

use crate::{EngineResult, map_store_err};

/// Reconstructs account balances from the durable entry log, seeded
/// from the most recent applicable snapshot when one exists.
pub struct BalanceEngine {
    store: Arc<dyn LedgerStore>,
}

impl BalanceEngine {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn get_balance(&self, account_id: &AccountId) -> EngineResult<Money> {
        self.get_balance_as_of(account_id, Utc::now()).await
    }

    pub async fn get_balance_as_of(
        &self,
        account_id: &AccountId,
        cutoff: DateTime<Utc>,
    ) -> EngineResult<Money> {
        let account = self.store.get_account(account_id).await.map_err(map_store_err)?;

        let snapshot = self
            .store
            .find_latest_snapshot(account_id, cutoff)
            .await
            .map_err(map_store_err)?;

        let (mut balance, after) = match &snapshot {
            Some(s) => (s.balance.clone(), Some(s.snapshot_time)),
            None => (Money::zero(account.currency.clone()), None),
        };

        let entries = self
            .store
            .find_entries(account_id, after, cutoff)
            .await
            .map_err(map_store_err)?;

        for entry in &entries {
            balance = apply_entry(&account, &balance, entry)?;
        }

        Ok(balance)
    }
}

fn apply_entry(account: &Account, balance: &Money, entry: &LedgerEntry) -> EngineResult<Money> {
    let increases = match (account.account_type, entry.side) {
        (AccountType::Asset | AccountType::Expense, EntrySide::Debit) => true,
        (AccountType::Asset | AccountType::Expense, EntrySide::Credit) => false,
        (AccountType::Liability | AccountType::Equity | AccountType::Revenue, EntrySide::Credit) => true,
        (AccountType::Liability | AccountType::Equity | AccountType::Revenue, EntrySide::Debit) => false,
    };

    let result = if increases {
        balance.add(&entry.amount)
    } else {
        balance.subtract(&entry.amount)
    };
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{AccountStatus, EventCategory};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> Arc<InMemoryLedgerStore> {
        let store = Arc::new(InMemoryLedgerStore::new());
        store
            .create_account(Account {
                id: "a".into(),
                account_type: AccountType::Asset,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .expect("create a");
        store
            .create_account(Account {
                id: "b".into(),
                account_type: AccountType::Liability,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .expect("create b");
        store
    }

    #[tokio::test]
    async fn zero_balance_with_no_entries() {
        let store = seeded_store().await;
        let engine = BalanceEngine::new(store);
        let balance = engine.get_balance(&"a".to_string()).await.expect("balance");
        assert_eq!(balance.amount(), dec!(0));
    }

    #[tokio::test]
    async fn applies_entries_by_classification() {
        let store = seeded_store().await;
        let now = Utc::now();
        let txn = ledger_core::LedgerTransaction {
            id: "t1".into(),
            external_id: "x1".into(),
            event_category: EventCategory::Deposit,
            status: ledger_core::TransactionStatus::Posted,
            created_at: now,
            reversing_transaction_id: None,
        };
        let entries = vec![
            LedgerEntry {
                id: "e1".into(),
                transaction_id: "t1".into(),
                account_id: "a".into(),
                amount: Money::new(dec!(100), "BRL"),
                side: EntrySide::Debit,
                event_category: EventCategory::Deposit,
                event_time: now,
                recorded_at: now,
            },
            LedgerEntry {
                id: "e2".into(),
                transaction_id: "t1".into(),
                account_id: "b".into(),
                amount: Money::new(dec!(100), "BRL"),
                side: EntrySide::Credit,
                event_category: EventCategory::Deposit,
                event_time: now,
                recorded_at: now,
            },
        ];
        let outbox = ledger_core::OutboxRecord {
            id: "ob1".into(),
            aggregate_id: "t1".into(),
            event_type: "TRANSACTION_POSTED".into(),
            payload: vec![],
            created_at: now,
            processed_at: None,
            attempts: 0,
            last_error: None,
            status: ledger_core::OutboxStatus::Pending,
        };
        store.post_transaction(txn, entries, outbox).await.expect("post");

        let engine = BalanceEngine::new(store);
        let asset_balance = engine.get_balance(&"a".to_string()).await.expect("a balance");
        assert_eq!(asset_balance.amount(), dec!(100));

        let liability_balance = engine.get_balance(&"b".to_string()).await.expect("b balance");
        assert_eq!(liability_balance.amount(), dec!(100));
    }
}
