use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use ledger_core::{Account, AccountType, EntrySide, EventCategory, Money, SystemClock, TransactionWithEntries, UuidGen};
use ledger_engine::{AccountAdmin, BalanceEngine, EntryDraft, LedgerPoster, PostCommand, Reverser};
use ledger_store::{LedgerStore, PostgresLedgerStore};
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AccountTypeArg {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl From<AccountTypeArg> for AccountType {
    fn from(value: AccountTypeArg) -> Self {
        match value {
            AccountTypeArg::Asset => AccountType::Asset,
            AccountTypeArg::Liability => AccountType::Liability,
            AccountTypeArg::Equity => AccountType::Equity,
            AccountTypeArg::Revenue => AccountType::Revenue,
            AccountTypeArg::Expense => AccountType::Expense,
        }
    }
}

/// Shared handles the CLI subcommands drive. Built once per invocation
/// from the configured Postgres connection.
pub struct Context {
    pub store: Arc<dyn LedgerStore>,
    pub admin: AccountAdmin,
    pub poster: LedgerPoster,
    pub reverser: Reverser,
    pub balances: BalanceEngine,
}

impl Context {
    pub async fn connect(config: &Config) -> Result<Self> {
        let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::connect(&config.database_url).await?);
        let clock = Arc::new(SystemClock);
        let ids = Arc::new(UuidGen);
        Ok(Self {
            admin: AccountAdmin::new(store.clone(), clock.clone(), ids.clone()),
            poster: LedgerPoster::new(store.clone(), clock.clone(), ids.clone()),
            reverser: Reverser::new(store.clone(), clock.clone(), ids.clone()),
            balances: BalanceEngine::new(store.clone()),
            store,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequestFile {
    external_id: String,
    event_category: EventCategory,
    entries: Vec<PostEntryFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostEntryFile {
    account_id: String,
    amount: rust_decimal::Decimal,
    currency: String,
    side: EntrySide,
}

impl PostRequestFile {
    pub fn into_command(self) -> PostCommand {
        PostCommand {
            external_id: self.external_id,
            event_category: self.event_category,
            entries: self
                .entries
                .into_iter()
                .map(|e| EntryDraft {
                    account_id: e.account_id,
                    amount: e.amount,
                    currency: e.currency,
                    side: e.side,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountView<'a> {
    id: &'a str,
    account_type: AccountType,
    currency: &'a str,
    status: ledger_core::AccountStatus,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Account> for AccountView<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: &account.id,
            account_type: account.account_type,
            currency: &account.currency,
            status: account.status,
            created_at: account.created_at,
        }
    }
}

pub fn print_account(account: &Account, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(&AccountView::from(account))?);
    } else {
        println!(
            "{}  {}  {}  {:?}",
            account.id, account.account_type, account.currency, account.status
        );
    }
    Ok(())
}

pub fn print_accounts(accounts: &[Account], as_json: bool) -> Result<()> {
    if as_json {
        let views: Vec<_> = accounts.iter().map(AccountView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    for account in accounts {
        println!(
            "{}  {}  {}  {:?}",
            account.id, account.account_type, account.currency, account.status
        );
    }
    Ok(())
}

pub fn print_transaction(txn: &TransactionWithEntries, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(txn)?);
        return Ok(());
    }
    println!(
        "{}  external={}  status={:?}  category={:?}",
        txn.transaction.id, txn.transaction.external_id, txn.transaction.status, txn.transaction.event_category
    );
    for entry in &txn.entries {
        println!(
            "  {:?} {} {} -> {}",
            entry.side,
            entry.amount.amount(),
            entry.amount.currency(),
            entry.account_id
        );
    }
    Ok(())
}

pub fn print_balance(account_id: &str, balance: &Money, as_of: DateTime<Utc>, as_json: bool) -> Result<()> {
    if as_json {
        let body = serde_json::json!({
            "accountId": account_id,
            "amount": balance.amount(),
            "currency": balance.currency(),
            "asOf": as_of,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    println!("{account_id}  {} {}  as of {as_of}", balance.amount(), balance.currency());
    Ok(())
}
