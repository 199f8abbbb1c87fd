use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledger_core::{AccountStatus, BalanceSnapshot, Clock, IdGen, LedgerError};
use ledger_store::LedgerStore;
use tracing::{info, warn};

use crate::{BalanceEngine, EngineResult, map_store_err};

/// Accelerates future balance reconstruction by periodically
/// checkpointing each active account's balance.
pub struct SnapshotMaker {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    balances: BalanceEngine,
}

impl SnapshotMaker {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGen>) -> Self {
        let balances = BalanceEngine::new(store.clone());
        Self { store, clock, ids, balances }
    }

    /// Snapshots every ACTIVE account as of `cutoff`. Each account is
    /// its own durable transaction, so one failure does not abort the
    /// batch; failures are logged and skipped.
    pub async fn create_snapshots(&self, cutoff: DateTime<Utc>) -> EngineResult<usize> {
        if cutoff > self.clock.now() {
            return Err(LedgerError::InvalidArg(
                "snapshot cutoff may not be in the future".into(),
            ));
        }

        let accounts = self.store.list_accounts().await.map_err(map_store_err)?;
        let mut created = 0;

        for account in accounts.into_iter().filter(|a| a.status == AccountStatus::Active) {
            if self
                .store
                .find_latest_snapshot(&account.id, cutoff)
                .await
                .map_err(map_store_err)?
                .is_some_and(|s| s.snapshot_time == cutoff)
            {
                continue;
            }

            match self.balances.get_balance_as_of(&account.id, cutoff).await {
                Ok(balance) => {
                    let snapshot = BalanceSnapshot {
                        id: self.ids.next_id(),
                        account_id: account.id.clone(),
                        balance,
                        snapshot_time: cutoff,
                        last_entry_id: None,
                        created_at: self.clock.now(),
                    };
                    match self.store.persist_snapshot(snapshot).await {
                        Ok(()) => {
                            created += 1;
                            info!(account_id = %account.id, %cutoff, "snapshot created");
                        }
                        Err(err) => warn!(account_id = %account.id, %err, "failed to persist snapshot"),
                    }
                }
                Err(err) => warn!(account_id = %account.id, %err, "failed to compute balance for snapshot"),
            }
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Account, AccountType, FixedClock, UuidGen};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn snapshots_active_accounts_only() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let now = Utc::now();
        store
            .create_account(Account {
                id: "a".into(),
                account_type: AccountType::Asset,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: now,
            })
            .await
            .expect("create a");
        store
            .create_account(Account {
                id: "b".into(),
                account_type: AccountType::Liability,
                currency: "BRL".into(),
                status: AccountStatus::Closed,
                created_at: now,
            })
            .await
            .expect("create b");

        let clock = Arc::new(FixedClock::new(now));
        let ids = Arc::new(UuidGen);
        let maker = SnapshotMaker::new(store.clone(), clock, ids);

        let created = maker.create_snapshots(now).await.expect("snapshot");
        assert_eq!(created, 1);

        let snapshot = store
            .find_latest_snapshot(&"a".to_string(), now)
            .await
            .expect("find")
            .expect("snapshot exists");
        assert_eq!(snapshot.balance.amount(), dec!(0));
    }

    #[tokio::test]
    async fn rejects_future_cutoff() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let ids = Arc::new(UuidGen);
        let maker = SnapshotMaker::new(store, clock, ids);

        let err = maker
            .create_snapshots(now + chrono::Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArg(_)));
    }

    #[tokio::test]
    async fn skips_account_with_existing_snapshot_at_cutoff() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let now = Utc::now();
        store
            .create_account(Account {
                id: "a".into(),
                account_type: AccountType::Asset,
                currency: "BRL".into(),
                status: AccountStatus::Active,
                created_at: now,
            })
            .await
            .expect("create a");

        let clock = Arc::new(FixedClock::new(now));
        let ids = Arc::new(UuidGen);
        let maker = SnapshotMaker::new(store.clone(), clock, ids);

        let first = maker.create_snapshots(now).await.expect("first snapshot");
        let second = maker.create_snapshots(now).await.expect("second snapshot");
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }
}
