use chrono::{DateTime, Utc};
use ledger_core::{
    Account, AccountId, AccountStatus, AccountType, EntrySide, EventCategory, LedgerEntry, Money,
    TransactionId, TransactionStatus, TransactionWithEntries,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub id: AccountId,
    pub account_type: AccountType,
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_type: account.account_type,
            currency: account.currency,
            status: account.status,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub account_type: AccountType,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDto {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub side: EntrySide,
    pub event_time: DateTime<Utc>,
}

impl From<&LedgerEntry> for EntryDto {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            account_id: entry.account_id.clone(),
            amount: entry.amount.amount(),
            currency: entry.amount.currency().to_string(),
            side: entry.side,
            event_time: entry.event_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: TransactionId,
    pub external_id: String,
    pub event_category: EventCategory,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub reversing_transaction_id: Option<TransactionId>,
    pub entries: Vec<EntryDto>,
}

impl From<TransactionWithEntries> for TransactionDto {
    fn from(txn: TransactionWithEntries) -> Self {
        Self {
            id: txn.transaction.id,
            external_id: txn.transaction.external_id,
            event_category: txn.transaction.event_category,
            status: txn.transaction.status,
            created_at: txn.transaction.created_at,
            reversing_transaction_id: txn.transaction.reversing_transaction_id,
            entries: txn.entries.iter().map(EntryDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntryDraftDto {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub side: EntrySide,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommandRequest {
    pub external_id: String,
    pub event_category: EventCategory,
    pub entries: Vec<PostEntryDraftDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    pub reversal_external_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
    pub as_of: DateTime<Utc>,
}

impl BalanceDto {
    #[must_use]
    pub fn new(account_id: AccountId, balance: &Money, as_of: DateTime<Utc>) -> Self {
        Self {
            account_id,
            amount: balance.amount(),
            currency: balance.currency().to_string(),
            as_of,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsOfQuery {
    pub time: DateTime<Utc>,
}
