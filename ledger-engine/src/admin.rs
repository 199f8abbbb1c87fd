use std::sync::Arc;

use ledger_core::{Account, AccountId, AccountStatus, AccountType, Clock, IdGen, LedgerError};
use ledger_store::LedgerStore;

use crate::{EngineResult, map_store_err};

/// Account lifecycle: create, block, unblock, close. A simple state
/// machine enforced by `AccountStatus::can_transition_to`; `close` is
/// terminal and does not check for a zero balance.
pub struct AccountAdmin {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
}

impl AccountAdmin {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGen>) -> Self {
        Self { store, clock, ids }
    }

    pub async fn create(&self, account_type: AccountType, currency: String) -> EngineResult<Account> {
        let currency = currency.to_ascii_uppercase();
        if currency.len() != 3 {
            return Err(LedgerError::InvalidArg(format!(
                "currency must be a 3-letter ISO 4217 code, got {currency}"
            )));
        }

        let account = Account {
            id: self.ids.next_id(),
            account_type,
            currency,
            status: AccountStatus::Active,
            created_at: self.clock.now(),
        };
        self.store.create_account(account).await.map_err(map_store_err)
    }

    pub async fn block(&self, id: &AccountId) -> EngineResult<Account> {
        self.transition(id, AccountStatus::Blocked).await
    }

    pub async fn unblock(&self, id: &AccountId) -> EngineResult<Account> {
        self.transition(id, AccountStatus::Active).await
    }

    pub async fn close(&self, id: &AccountId) -> EngineResult<Account> {
        self.transition(id, AccountStatus::Closed).await
    }

    async fn transition(&self, id: &AccountId, next: AccountStatus) -> EngineResult<Account> {
        let account = self.store.get_account(id).await.map_err(map_store_err)?;
        if !account.status.can_transition_to(next) {
            return Err(LedgerError::InvalidAccountStateTransition(format!(
                "account {id} cannot transition from {:?} to {:?}",
                account.status, next
            )));
        }
        self.store
            .update_account_status(id, next)
            .await
            .map_err(map_store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{FixedClock, UuidGen};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;

    fn admin() -> AccountAdmin {
        let store = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let ids = Arc::new(UuidGen);
        AccountAdmin::new(store, clock, ids)
    }

    #[tokio::test]
    async fn creates_active_account() {
        let admin = admin();
        let account = admin.create(AccountType::Asset, "brl".into()).await.expect("create");
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.currency, "BRL");
    }

    #[tokio::test]
    async fn rejects_invalid_currency_code() {
        let admin = admin();
        let err = admin.create(AccountType::Asset, "dollars".into()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArg(_)));
    }

    #[tokio::test]
    async fn block_then_unblock_round_trip() {
        let admin = admin();
        let account = admin.create(AccountType::Asset, "BRL".into()).await.expect("create");
        let blocked = admin.block(&account.id).await.expect("block");
        assert_eq!(blocked.status, AccountStatus::Blocked);
        let unblocked = admin.unblock(&account.id).await.expect("unblock");
        assert_eq!(unblocked.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn close_is_terminal() {
        let admin = admin();
        let account = admin.create(AccountType::Asset, "BRL".into()).await.expect("create");
        admin.close(&account.id).await.expect("close");
        let err = admin.unblock(&account.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountStateTransition(_)));
    }
}
