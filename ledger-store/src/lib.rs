#![deny(clippy::print_stdout, clippy::print_stderr)]

//! Durable storage contract for the ledger: accounts, transactions,
//! entries, balance snapshots, and the outbox. Two implementations are
//! provided: an in-memory store for tests, and (behind the
//! `postgres-store` feature) a `sqlx`-backed PostgreSQL store for
//! production, mirroring how other store-shaped components in this
//! codebase gate an optional backing store behind a feature flag.

mod memory;
#[cfg(feature = "postgres-store")]
mod postgres;

pub use memory::InMemoryLedgerStore;
#[cfg(feature = "postgres-store")]
pub use postgres::PostgresLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::{
    Account, AccountId, AccountStatus, BalanceSnapshot, LedgerEntry, LedgerTransaction, OutboxId,
    OutboxRecord, TransactionId, TransactionWithEntries,
};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("duplicate external id: {0}")]
    DuplicateExternalId(String),
    #[error("invalid account state transition: {0}")]
    InvalidAccountStateTransition(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable, atomic persistence for the ledger. Each method that
/// mutates more than one row opens its own durable transaction and
/// commits or rolls back on every exit path; callers never see a
/// partial write. Account rows touched by `post_transaction` and
/// `post_reversal` are locked in ascending id order by the
/// implementation, the sole deadlock-avoidance discipline for writers
/// that share accounts.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(&self, account: Account) -> StoreResult<Account>;
    async fn get_account(&self, id: &AccountId) -> StoreResult<Account>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    async fn update_account_status(
        &self,
        id: &AccountId,
        next: AccountStatus,
    ) -> StoreResult<Account>;

    async fn find_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<TransactionWithEntries>>;
    async fn get_transaction(&self, id: &TransactionId) -> StoreResult<TransactionWithEntries>;

    /// Locks the accounts named by `entries` in ascending id order,
    /// then persists `transaction`, `entries`, and `outbox` atomically.
    /// Fails with `DuplicateExternalId` if the external id is already
    /// present (enforced by a unique index in durable backends).
    async fn post_transaction(
        &self,
        transaction: LedgerTransaction,
        entries: Vec<LedgerEntry>,
        outbox: OutboxRecord,
    ) -> StoreResult<TransactionWithEntries>;

    /// Locks the accounts named by `entries` in ascending id order,
    /// persists the reversal `transaction` + `entries` + `outbox`, and
    /// marks `original_id` as REVERSED with its reversing id set, all
    /// in one durable transaction.
    async fn post_reversal(
        &self,
        original_id: &TransactionId,
        transaction: LedgerTransaction,
        entries: Vec<LedgerEntry>,
        outbox: OutboxRecord,
    ) -> StoreResult<TransactionWithEntries>;

    /// POSTED entries for `account_id` with `event_time` in
    /// `(after, at_or_before]`, ordered by `event_time` ascending.
    /// `after = None` means unbounded below.
    async fn find_entries(
        &self,
        account_id: &AccountId,
        after: Option<DateTime<Utc>>,
        at_or_before: DateTime<Utc>,
    ) -> StoreResult<Vec<LedgerEntry>>;

    async fn find_latest_snapshot(
        &self,
        account_id: &AccountId,
        at_or_before: DateTime<Utc>,
    ) -> StoreResult<Option<BalanceSnapshot>>;

    /// Fails if a snapshot already exists for `(account_id, snapshot_time)`.
    async fn persist_snapshot(&self, snapshot: BalanceSnapshot) -> StoreResult<()>;

    /// Oldest-first PENDING rows, selected with skip-locked semantics
    /// so concurrent relay instances do not reprocess the same row.
    async fn fetch_pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxRecord>>;

    async fn mark_outbox_processed(
        &self,
        id: &OutboxId,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Increments the attempt counter and records `error`; transitions
    /// to FAILED once attempts reach `max_attempts`.
    async fn mark_outbox_attempt_failed(
        &self,
        id: &OutboxId,
        error: String,
        max_attempts: u32,
    ) -> StoreResult<()>;

    /// Row counts by status, for the relay's periodic health log. Takes
    /// no lock; an approximate read is acceptable for observability.
    async fn count_outbox_by_status(&self) -> StoreResult<OutboxHealth>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxHealth {
    pub pending: u64,
    pub processed: u64,
    pub failed: u64,
}
