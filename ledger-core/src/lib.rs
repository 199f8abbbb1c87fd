#![deny(clippy::print_stdout, clippy::print_stderr)]

//! Domain types shared by every ledger crate: money, identifiers, the
//! bookkeeping entities, the double-entry validator, and the clock
//! abstraction used to keep time-dependent behavior testable.

mod clock;
mod ids;
mod money;
mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{IdGen, UuidGen};
pub use money::{Money, MoneyError};
pub use validator::{ValidationError, validate_entries};

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AccountId = String;
pub type TransactionId = String;
pub type EntryId = String;
pub type SnapshotId = String;
pub type OutboxId = String;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// The shared error taxonomy. Each variant is surfaced by API/CLI
/// callers as the most specific kind available.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("account not active: {0}")]
    AccountNotActive(AccountId),
    #[error("currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("unbalanced entries: {0}")]
    Unbalanced(String),
    #[error("too few entries: at least 2 required, got {0}")]
    TooFewEntries(usize),
    #[error("duplicate external id: {0}")]
    DuplicateExternalId(String),
    #[error("transaction not reversible: {0}")]
    NotReversible(TransactionId),
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("invalid account state transition: {0}")]
    InvalidAccountStateTransition(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::TooFewEntries(n) => LedgerError::TooFewEntries(n),
            ValidationError::Unbalanced(msg) => LedgerError::Unbalanced(msg),
            ValidationError::CurrencySetMismatch(msg) => LedgerError::Unbalanced(msg),
        }
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch { lhs, rhs } => {
                LedgerError::CurrencyMismatch(format!("{lhs} vs {rhs}"))
            }
            MoneyError::NegativeResult => {
                LedgerError::InvalidArg("operation would produce a negative amount".into())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Whether a DEBIT to an account of this classification increases
    /// its balance (true) or decreases it (false).
    #[must_use]
    pub fn debit_increases(self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Equity => "EQUITY",
            AccountType::Revenue => "REVENUE",
            AccountType::Expense => "EXPENSE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Blocked,
    Closed,
}

impl AccountStatus {
    #[must_use]
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        match (self, next) {
            (AccountStatus::Active, AccountStatus::Blocked) => true,
            (AccountStatus::Blocked, AccountStatus::Active) => true,
            (_, AccountStatus::Closed) => self != AccountStatus::Closed,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_type: AccountType,
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Transfer,
    Pix,
    Ted,
    Doc,
    Fee,
    Interest,
    Reversal,
    Deposit,
    Withdrawal,
    Payment,
    Refund,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Posted,
    Reversed,
    Failed,
}

impl TransactionStatus {
    #[must_use]
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Posted)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
                | (TransactionStatus::Posted, TransactionStatus::Reversed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub external_id: String,
    pub event_category: EventCategory,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub reversing_transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    #[must_use]
    pub fn flip(self) -> EntrySide {
        match self {
            EntrySide::Debit => EntrySide::Credit,
            EntrySide::Credit => EntrySide::Debit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub amount: Money,
    pub side: EntrySide,
    pub event_category: EventCategory,
    pub event_time: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWithEntries {
    pub transaction: LedgerTransaction,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub id: SnapshotId,
    pub account_id: AccountId,
    pub balance: Money,
    pub snapshot_time: DateTime<Utc>,
    pub last_entry_id: Option<EntryId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: OutboxId,
    pub aggregate_id: TransactionId,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub status: OutboxStatus,
}

pub const EVENT_TYPE_TRANSACTION_POSTED: &str = "TRANSACTION_POSTED";
pub const EVENT_TYPE_TRANSACTION_REVERSED: &str = "TRANSACTION_REVERSED";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_status_transitions() {
        assert!(AccountStatus::Active.can_transition_to(AccountStatus::Blocked));
        assert!(AccountStatus::Blocked.can_transition_to(AccountStatus::Active));
        assert!(AccountStatus::Active.can_transition_to(AccountStatus::Closed));
        assert!(!AccountStatus::Closed.can_transition_to(AccountStatus::Active));
        assert!(!AccountStatus::Closed.can_transition_to(AccountStatus::Closed));
    }

    #[test]
    fn transaction_status_transitions() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Posted));
        assert!(TransactionStatus::Posted.can_transition_to(TransactionStatus::Reversed));
        assert!(!TransactionStatus::Reversed.can_transition_to(TransactionStatus::Posted));
    }

    #[test]
    fn entry_side_flips() {
        assert_eq!(EntrySide::Debit.flip(), EntrySide::Credit);
        assert_eq!(EntrySide::Credit.flip(), EntrySide::Debit);
    }

    #[test]
    fn debit_increases_by_classification() {
        assert!(AccountType::Asset.debit_increases());
        assert!(AccountType::Expense.debit_increases());
        assert!(!AccountType::Liability.debit_increases());
        assert!(!AccountType::Equity.debit_increases());
        assert!(!AccountType::Revenue.debit_increases());
    }
}
