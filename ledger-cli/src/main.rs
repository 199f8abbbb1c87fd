use anyhow::Result;
use clap::Parser;
use ledger_cli::LedgerCli;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = LedgerCli::parse();
    ledger_cli::run(cli).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ledger_cli=info,ledger_engine=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
