use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::{
    Account, AccountId, AccountStatus, AccountType, BalanceSnapshot, EntrySide, EventCategory,
    LedgerEntry, LedgerTransaction, Money, OutboxId, OutboxRecord, OutboxStatus, TransactionId,
    TransactionStatus, TransactionWithEntries,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::{LedgerStore, OutboxHealth, StoreError, StoreResult};

/// `sqlx`-backed store. Account rows are locked with
/// `SELECT ... FOR UPDATE` in ascending id order inside a single
/// transaction per write; the outbox poller uses
/// `FOR UPDATE SKIP LOCKED` so concurrent relay instances never pick up
/// the same row.
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_accounts (
                id TEXT PRIMARY KEY,
                account_type TEXT NOT NULL,
                currency TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_transactions (
                id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                event_category TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                reversing_transaction_id TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id TEXT PRIMARY KEY,
                transaction_id TEXT NOT NULL REFERENCES ledger_transactions(id),
                account_id TEXT NOT NULL REFERENCES ledger_accounts(id),
                amount NUMERIC NOT NULL CHECK (amount > 0),
                currency TEXT NOT NULL,
                side TEXT NOT NULL,
                event_category TEXT NOT NULL,
                event_time TIMESTAMPTZ NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS ledger_entries_account_time ON ledger_entries (account_id, event_time)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_snapshots (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES ledger_accounts(id),
                balance NUMERIC NOT NULL,
                currency TEXT NOT NULL,
                snapshot_time TIMESTAMPTZ NOT NULL,
                last_entry_id TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                UNIQUE (account_id, snapshot_time)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ledger_outbox (
                id TEXT PRIMARY KEY,
                aggregate_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                payload BYTEA NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                processed_at TIMESTAMPTZ,
                attempts INT NOT NULL DEFAULT 0,
                last_error TEXT,
                status TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS ledger_outbox_pending ON ledger_outbox (created_at) WHERE status = 'PENDING'",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS ledger_outbox_aggregate ON ledger_outbox (aggregate_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn account_type_to_str(t: AccountType) -> &'static str {
    match t {
        AccountType::Asset => "ASSET",
        AccountType::Liability => "LIABILITY",
        AccountType::Equity => "EQUITY",
        AccountType::Revenue => "REVENUE",
        AccountType::Expense => "EXPENSE",
    }
}

fn account_type_from_str(s: &str) -> Result<AccountType, StoreError> {
    match s {
        "ASSET" => Ok(AccountType::Asset),
        "LIABILITY" => Ok(AccountType::Liability),
        "EQUITY" => Ok(AccountType::Equity),
        "REVENUE" => Ok(AccountType::Revenue),
        "EXPENSE" => Ok(AccountType::Expense),
        other => Err(StoreError::Storage(format!("unknown account_type {other}"))),
    }
}

fn account_status_to_str(s: AccountStatus) -> &'static str {
    match s {
        AccountStatus::Active => "ACTIVE",
        AccountStatus::Blocked => "BLOCKED",
        AccountStatus::Closed => "CLOSED",
    }
}

fn account_status_from_str(s: &str) -> Result<AccountStatus, StoreError> {
    match s {
        "ACTIVE" => Ok(AccountStatus::Active),
        "BLOCKED" => Ok(AccountStatus::Blocked),
        "CLOSED" => Ok(AccountStatus::Closed),
        other => Err(StoreError::Storage(format!("unknown account_status {other}"))),
    }
}

fn event_category_to_str(c: EventCategory) -> &'static str {
    match c {
        EventCategory::Transfer => "TRANSFER",
        EventCategory::Pix => "PIX",
        EventCategory::Ted => "TED",
        EventCategory::Doc => "DOC",
        EventCategory::Fee => "FEE",
        EventCategory::Interest => "INTEREST",
        EventCategory::Reversal => "REVERSAL",
        EventCategory::Deposit => "DEPOSIT",
        EventCategory::Withdrawal => "WITHDRAWAL",
        EventCategory::Payment => "PAYMENT",
        EventCategory::Refund => "REFUND",
        EventCategory::Adjustment => "ADJUSTMENT",
    }
}

fn event_category_from_str(s: &str) -> Result<EventCategory, StoreError> {
    Ok(match s {
        "TRANSFER" => EventCategory::Transfer,
        "PIX" => EventCategory::Pix,
        "TED" => EventCategory::Ted,
        "DOC" => EventCategory::Doc,
        "FEE" => EventCategory::Fee,
        "INTEREST" => EventCategory::Interest,
        "REVERSAL" => EventCategory::Reversal,
        "DEPOSIT" => EventCategory::Deposit,
        "WITHDRAWAL" => EventCategory::Withdrawal,
        "PAYMENT" => EventCategory::Payment,
        "REFUND" => EventCategory::Refund,
        "ADJUSTMENT" => EventCategory::Adjustment,
        other => return Err(StoreError::Storage(format!("unknown event_category {other}"))),
    })
}

fn transaction_status_to_str(s: TransactionStatus) -> &'static str {
    match s {
        TransactionStatus::Pending => "PENDING",
        TransactionStatus::Posted => "POSTED",
        TransactionStatus::Reversed => "REVERSED",
        TransactionStatus::Failed => "FAILED",
    }
}

fn transaction_status_from_str(s: &str) -> Result<TransactionStatus, StoreError> {
    Ok(match s {
        "PENDING" => TransactionStatus::Pending,
        "POSTED" => TransactionStatus::Posted,
        "REVERSED" => TransactionStatus::Reversed,
        "FAILED" => TransactionStatus::Failed,
        other => return Err(StoreError::Storage(format!("unknown transaction_status {other}"))),
    })
}

fn outbox_status_to_str(s: OutboxStatus) -> &'static str {
    match s {
        OutboxStatus::Pending => "PENDING",
        OutboxStatus::Processed => "PROCESSED",
        OutboxStatus::Failed => "FAILED",
    }
}

fn outbox_status_from_str(s: &str) -> Result<OutboxStatus, StoreError> {
    Ok(match s {
        "PENDING" => OutboxStatus::Pending,
        "PROCESSED" => OutboxStatus::Processed,
        "FAILED" => OutboxStatus::Failed,
        other => return Err(StoreError::Storage(format!("unknown outbox_status {other}"))),
    })
}

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return StoreError::DuplicateExternalId(db_err.message().to_string());
    }
    StoreError::Storage(err.to_string())
}

async fn lock_accounts_ascending(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_ids: &BTreeSet<AccountId>,
) -> StoreResult<Vec<Account>> {
    let mut locked = Vec::with_capacity(account_ids.len());
    for id in account_ids {
        let row = sqlx::query(
            "SELECT id, account_type, currency, status, created_at FROM ledger_accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;

        locked.push(Account {
            id: row.get("id"),
            account_type: account_type_from_str(row.get("account_type"))?,
            currency: row.get("currency"),
            status: account_status_from_str(row.get("status"))?,
            created_at: row.get("created_at"),
        });
    }
    Ok(locked)
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn create_account(&self, account: Account) -> StoreResult<Account> {
        sqlx::query(
            "INSERT INTO ledger_accounts (id, account_type, currency, status, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&account.id)
        .bind(account_type_to_str(account.account_type))
        .bind(&account.currency)
        .bind(account_status_to_str(account.status))
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(account)
    }

    async fn get_account(&self, id: &AccountId) -> StoreResult<Account> {
        let row = sqlx::query("SELECT id, account_type, currency, status, created_at FROM ledger_accounts WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;
        Ok(Account {
            id: row.get("id"),
            account_type: account_type_from_str(row.get("account_type"))?,
            currency: row.get("currency"),
            status: account_status_from_str(row.get("status"))?,
            created_at: row.get("created_at"),
        })
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query("SELECT id, account_type, currency, status, created_at FROM ledger_accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(Account {
                    id: row.get("id"),
                    account_type: account_type_from_str(row.get("account_type"))?,
                    currency: row.get("currency"),
                    status: account_status_from_str(row.get("status"))?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn update_account_status(
        &self,
        id: &AccountId,
        next: AccountStatus,
    ) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let row = sqlx::query("SELECT status FROM ledger_accounts WHERE id = $1 FOR UPDATE")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;
        let current = account_status_from_str(row.get("status"))?;
        if !current.can_transition_to(next) {
            tx.rollback().await.ok();
            return Err(StoreError::InvalidAccountStateTransition(format!(
                "{current:?} -> {next:?}"
            )));
        }
        sqlx::query("UPDATE ledger_accounts SET status = $1 WHERE id = $2")
            .bind(account_status_to_str(next))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)?;
        self.get_account(id).await
    }

    async fn find_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<TransactionWithEntries>> {
        let row = sqlx::query(
            "SELECT id FROM ledger_transactions WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: TransactionId = row.get("id");
        self.get_transaction(&id).await.map(Some)
    }

    async fn get_transaction(&self, id: &TransactionId) -> StoreResult<TransactionWithEntries> {
        let row = sqlx::query(
            "SELECT id, external_id, event_category, status, created_at, reversing_transaction_id FROM ledger_transactions WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| StoreError::TransactionNotFound(id.clone()))?;

        let transaction = LedgerTransaction {
            id: row.get("id"),
            external_id: row.get("external_id"),
            event_category: event_category_from_str(row.get("event_category"))?,
            status: transaction_status_from_str(row.get("status"))?,
            created_at: row.get("created_at"),
            reversing_transaction_id: row.get("reversing_transaction_id"),
        };

        let entry_rows = sqlx::query(
            "SELECT id, transaction_id, account_id, amount, currency, side, event_category, event_time, recorded_at FROM ledger_entries WHERE transaction_id = $1 ORDER BY event_time",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let entries = entry_rows
            .into_iter()
            .map(|row| row_to_entry(&row))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    async fn post_transaction(
        &self,
        transaction: LedgerTransaction,
        entries: Vec<LedgerEntry>,
        outbox: OutboxRecord,
    ) -> StoreResult<TransactionWithEntries> {
        let account_ids: BTreeSet<AccountId> =
            entries.iter().map(|e| e.account_id.clone()).collect();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let locked = lock_accounts_ascending(&mut tx, &account_ids).await?;
        for account in &locked {
            if account.status != AccountStatus::Active {
                tx.rollback().await.ok();
                return Err(StoreError::InvalidAccountStateTransition(format!(
                    "account {} is not active",
                    account.id
                )));
            }
        }

        insert_transaction(&mut tx, &transaction).await?;
        for entry in &entries {
            insert_entry(&mut tx, entry).await?;
        }
        insert_outbox(&mut tx, &outbox).await?;

        tx.commit().await.map_err(map_sqlx_err)?;
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
        let account_ids: BTreeSet<AccountId> =
            entries.iter().map(|e| e.account_id.clone()).collect();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let original_row = sqlx::query("SELECT status FROM ledger_transactions WHERE id = $1 FOR UPDATE")
            .bind(original_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StoreError::TransactionNotFound(original_id.clone()))?;
        if transaction_status_from_str(original_row.get("status"))? != TransactionStatus::Posted {
            tx.rollback().await.ok();
            return Err(StoreError::InvalidAccountStateTransition(format!(
                "transaction {original_id} is not POSTED"
            )));
        }

        let locked = lock_accounts_ascending(&mut tx, &account_ids).await?;
        for account in &locked {
            if account.status != AccountStatus::Active {
                tx.rollback().await.ok();
                return Err(StoreError::InvalidAccountStateTransition(format!(
                    "account {} is not active",
                    account.id
                )));
            }
        }

        insert_transaction(&mut tx, &transaction).await?;
        for entry in &entries {
            insert_entry(&mut tx, entry).await?;
        }
        insert_outbox(&mut tx, &outbox).await?;

        sqlx::query(
            "UPDATE ledger_transactions SET status = $1, reversing_transaction_id = $2 WHERE id = $3",
        )
        .bind(transaction_status_to_str(TransactionStatus::Reversed))
        .bind(&transaction.id)
        .bind(original_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
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
        let rows = sqlx::query(
            r"
            SELECT e.id, e.transaction_id, e.account_id, e.amount, e.currency, e.side,
                   e.event_category, e.event_time, e.recorded_at
            FROM ledger_entries e
            JOIN ledger_transactions t ON t.id = e.transaction_id
            WHERE e.account_id = $1
              AND t.status = 'POSTED'
              AND ($2::timestamptz IS NULL OR e.event_time > $2)
              AND e.event_time <= $3
            ORDER BY e.event_time ASC
            ",
        )
        .bind(account_id.as_str())
        .bind(after)
        .bind(at_or_before)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn find_latest_snapshot(
        &self,
        account_id: &AccountId,
        at_or_before: DateTime<Utc>,
    ) -> StoreResult<Option<BalanceSnapshot>> {
        let row = sqlx::query(
            r"
            SELECT id, account_id, balance, currency, snapshot_time, last_entry_id, created_at
            FROM ledger_snapshots
            WHERE account_id = $1 AND snapshot_time <= $2
            ORDER BY snapshot_time DESC
            LIMIT 1
            ",
        )
        .bind(account_id.as_str())
        .bind(at_or_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(|row| {
            let balance_amount: rust_decimal::Decimal = row.get("balance");
            Ok(BalanceSnapshot {
                id: row.get("id"),
                account_id: row.get("account_id"),
                balance: Money::new(balance_amount, row.get::<String, _>("currency")),
                snapshot_time: row.get("snapshot_time"),
                last_entry_id: row.get("last_entry_id"),
                created_at: row.get("created_at"),
            })
        })
        .transpose()
    }

    async fn persist_snapshot(&self, snapshot: BalanceSnapshot) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO ledger_snapshots (id, account_id, balance, currency, snapshot_time, last_entry_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.account_id)
        .bind(snapshot.balance.amount())
        .bind(snapshot.balance.currency())
        .bind(snapshot.snapshot_time)
        .bind(&snapshot.last_entry_id)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn fetch_pending_outbox(&self, limit: usize) -> StoreResult<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, aggregate_id, event_type, payload, created_at, processed_at, attempts, last_error, status
            FROM ledger_outbox
            WHERE status = 'PENDING'
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            ",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(OutboxRecord {
                    id: row.get("id"),
                    aggregate_id: row.get("aggregate_id"),
                    event_type: row.get("event_type"),
                    payload: row.get("payload"),
                    created_at: row.get("created_at"),
                    processed_at: row.get("processed_at"),
                    attempts: u32::try_from(row.get::<i32, _>("attempts")).unwrap_or(0),
                    last_error: row.get("last_error"),
                    status: outbox_status_from_str(row.get("status"))?,
                })
            })
            .collect()
    }

    async fn mark_outbox_processed(
        &self,
        id: &OutboxId,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE ledger_outbox SET status = $1, processed_at = $2 WHERE id = $3")
            .bind(outbox_status_to_str(OutboxStatus::Processed))
            .bind(processed_at)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn mark_outbox_attempt_failed(
        &self,
        id: &OutboxId,
        error: String,
        max_attempts: u32,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let row = sqlx::query("SELECT attempts FROM ledger_outbox WHERE id = $1 FOR UPDATE")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StoreError::Storage(format!("outbox record {id} not found")))?;
        let attempts = u32::try_from(row.get::<i32, _>("attempts")).unwrap_or(0) + 1;
        let status = if attempts >= max_attempts {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        };
        sqlx::query("UPDATE ledger_outbox SET attempts = $1, last_error = $2, status = $3 WHERE id = $4")
            .bind(i32::try_from(attempts).unwrap_or(i32::MAX))
            .bind(error)
            .bind(outbox_status_to_str(status))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn count_outbox_by_status(&self) -> StoreResult<OutboxHealth> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM ledger_outbox GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let mut health = OutboxHealth::default();
        for row in rows {
            let count: i64 = row.get("count");
            let count = u64::try_from(count).unwrap_or(0);
            match outbox_status_from_str(row.get("status"))? {
                OutboxStatus::Pending => health.pending = count,
                OutboxStatus::Processed => health.processed = count,
                OutboxStatus::Failed => health.failed = count,
            }
        }
        Ok(health)
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> StoreResult<LedgerEntry> {
    let amount: rust_decimal::Decimal = row.get("amount");
    let side = match row.get::<&str, _>("side") {
        "DEBIT" => EntrySide::Debit,
        "CREDIT" => EntrySide::Credit,
        other => return Err(StoreError::Storage(format!("unknown side {other}"))),
    };
    Ok(LedgerEntry {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        account_id: row.get("account_id"),
        amount: Money::new(amount, row.get::<String, _>("currency")),
        side,
        event_category: event_category_from_str(row.get("event_category"))?,
        event_time: row.get("event_time"),
        recorded_at: row.get("recorded_at"),
    })
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transaction: &LedgerTransaction,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO ledger_transactions (id, external_id, event_category, status, created_at, reversing_transaction_id) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&transaction.id)
    .bind(&transaction.external_id)
    .bind(event_category_to_str(transaction.event_category))
    .bind(transaction_status_to_str(transaction.status))
    .bind(transaction.created_at)
    .bind(&transaction.reversing_transaction_id)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &LedgerEntry,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO ledger_entries (id, transaction_id, account_id, amount, currency, side, event_category, event_time, recorded_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&entry.id)
    .bind(&entry.transaction_id)
    .bind(&entry.account_id)
    .bind(entry.amount.amount())
    .bind(entry.amount.currency())
    .bind(match entry.side {
        EntrySide::Debit => "DEBIT",
        EntrySide::Credit => "CREDIT",
    })
    .bind(event_category_to_str(entry.event_category))
    .bind(entry.event_time)
    .bind(entry.recorded_at)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

async fn insert_outbox(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    outbox: &OutboxRecord,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO ledger_outbox (id, aggregate_id, event_type, payload, created_at, processed_at, attempts, last_error, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&outbox.id)
    .bind(&outbox.aggregate_id)
    .bind(&outbox.event_type)
    .bind(&outbox.payload)
    .bind(outbox.created_at)
    .bind(outbox.processed_at)
    .bind(i32::try_from(outbox.attempts).unwrap_or(0))
    .bind(&outbox.last_error)
    .bind(outbox_status_to_str(outbox.status))
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}
