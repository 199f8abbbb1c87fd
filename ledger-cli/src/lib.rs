//! Operator-facing command line: account and transaction operations
//! against a running store, plus the `serve` subcommand that wires up
//! the HTTP API and the two background workers (outbox relay, balance
//! snapshotter).

mod commands;
pub mod config;
mod serve;

use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

pub use config::Config;

#[derive(Debug, Parser)]
#[command(name = "ledger", about = "Operate the double-entry ledger service")]
pub struct LedgerCli {
    #[command(subcommand)]
    command: LedgerSubcommand,
}

#[derive(Debug, clap::Subcommand)]
enum LedgerSubcommand {
    /// Run the HTTP API and background workers until terminated.
    Serve,

    /// Account lifecycle operations.
    Account {
        #[command(subcommand)]
        command: AccountSubcommand,
    },

    /// Transaction posting and reversal.
    Transaction {
        #[command(subcommand)]
        command: TransactionSubcommand,
    },

    /// Balance reads.
    Balance {
        #[command(subcommand)]
        command: BalanceSubcommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum AccountSubcommand {
    /// Open a new account.
    Create {
        #[arg(long, value_enum)]
        account_type: commands::AccountTypeArg,
        /// ISO 4217 currency code, e.g. USD.
        #[arg(long)]
        currency: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Fetch an account by id.
    Get {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List accounts with offset/limit pagination.
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Block an account from further posting.
    Block {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Unblock a previously blocked account.
    Unblock {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Close an account permanently.
    Close {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, clap::Subcommand)]
enum TransactionSubcommand {
    /// Post a balanced multi-entry transaction from a JSON file.
    ///
    /// The file holds `{"externalId", "eventCategory", "entries": [...]}`,
    /// the same shape the HTTP API accepts.
    Post {
        /// Path to a JSON file describing the transaction.
        #[arg(long)]
        file: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Fetch a transaction by id.
    Get {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Reverse a posted transaction.
    Reverse {
        id: String,
        #[arg(long)]
        reversal_external_id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, clap::Subcommand)]
enum BalanceSubcommand {
    /// Current balance for an account.
    Get {
        account_id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Balance as of a specific point in time (RFC 3339).
    AsOf {
        account_id: String,
        #[arg(long)]
        time: chrono::DateTime<chrono::Utc>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    #[must_use]
    fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

pub async fn run(cli: LedgerCli) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    match cli.command {
        LedgerSubcommand::Serve => serve::run(config).await,
        LedgerSubcommand::Account { command } => run_account(config, command).await,
        LedgerSubcommand::Transaction { command } => run_transaction(config, command).await,
        LedgerSubcommand::Balance { command } => run_balance(config, command).await,
    }
}

async fn run_account(config: Config, command: AccountSubcommand) -> Result<()> {
    let ctx = commands::Context::connect(&config).await?;
    match command {
        AccountSubcommand::Create { account_type, currency, format } => {
            let account = ctx.admin.create(account_type.into(), currency).await?;
            commands::print_account(&account, format.is_json())
        }
        AccountSubcommand::Get { id, format } => {
            let account = ctx.store.get_account(&id).await?;
            commands::print_account(&account, format.is_json())
        }
        AccountSubcommand::List { offset, limit, format } => {
            let accounts = ctx.store.list_accounts().await?;
            let limit = limit.unwrap_or(accounts.len());
            let page: Vec<_> = accounts.into_iter().skip(offset).take(limit).collect();
            commands::print_accounts(&page, format.is_json())
        }
        AccountSubcommand::Block { id, format } => {
            let account = ctx.admin.block(&id).await?;
            commands::print_account(&account, format.is_json())
        }
        AccountSubcommand::Unblock { id, format } => {
            let account = ctx.admin.unblock(&id).await?;
            commands::print_account(&account, format.is_json())
        }
        AccountSubcommand::Close { id, format } => {
            let account = ctx.admin.close(&id).await?;
            commands::print_account(&account, format.is_json())
        }
    }
}

async fn run_transaction(config: Config, command: TransactionSubcommand) -> Result<()> {
    let ctx = commands::Context::connect(&config).await?;
    match command {
        TransactionSubcommand::Post { file, format } => {
            let raw = fs::read_to_string(&file).with_context(|| format!("reading {file}"))?;
            let request: commands::PostRequestFile =
                serde_json::from_str(&raw).with_context(|| format!("parsing {file} as transaction JSON"))?;
            let txn = ctx.poster.post(request.into_command()).await?;
            commands::print_transaction(&txn, format.is_json())
        }
        TransactionSubcommand::Get { id, format } => {
            let txn = ctx.store.get_transaction(&id).await?;
            commands::print_transaction(&txn, format.is_json())
        }
        TransactionSubcommand::Reverse { id, reversal_external_id, format } => {
            let txn = ctx.reverser.reverse(&id, reversal_external_id).await?;
            commands::print_transaction(&txn, format.is_json())
        }
    }
}

async fn run_balance(config: Config, command: BalanceSubcommand) -> Result<()> {
    let ctx = commands::Context::connect(&config).await?;
    match command {
        BalanceSubcommand::Get { account_id, format } => {
            let balance = ctx.balances.get_balance(&account_id).await?;
            commands::print_balance(&account_id, &balance, chrono::Utc::now(), format.is_json())
        }
        BalanceSubcommand::AsOf { account_id, time, format } => {
            let balance = ctx.balances.get_balance_as_of(&account_id, time).await?;
            commands::print_balance(&account_id, &balance, time, format.is_json())
        }
    }
}
