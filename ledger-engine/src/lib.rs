#![deny(clippy::print_stdout, clippy::print_stderr)]

//! Orchestration layer over `LedgerStore`: posting, reversal, balance
//! computation, snapshotting, and account administration. None of
//! these types touch storage directly beyond the `LedgerStore` trait,
//! so they are generic over any conforming backend.

mod admin;
mod balance;
mod poster;
mod reverser;
mod snapshot;

pub use admin::AccountAdmin;
pub use balance::BalanceEngine;
pub use poster::{EntryDraft, LedgerPoster, PostCommand};
pub use reverser::Reverser;
pub use snapshot::SnapshotMaker;

use ledger_core::LedgerError;
use ledger_store::StoreError;

pub type EngineResult<T> = Result<T, LedgerError>;

/// Maps a storage-layer failure onto the shared domain error taxonomy.
/// `LedgerStore` and `LedgerError` are defined in separate crates, so
/// this lives here rather than as a `From` impl (neither type is local
/// to either crate).
fn map_store_err(err: StoreError) -> LedgerError {
    match err {
        StoreError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
        StoreError::TransactionNotFound(id) => LedgerError::TransactionNotFound(id),
        StoreError::DuplicateExternalId(id) => LedgerError::DuplicateExternalId(id),
        StoreError::InvalidAccountStateTransition(msg) => {
            LedgerError::AccountNotActive(msg)
        }
        StoreError::Storage(msg) => LedgerError::Internal(msg),
    }
}
