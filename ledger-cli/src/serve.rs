use std::sync::Arc;

use anyhow::{Context, Result};
use ledger_core::{SystemClock, UuidGen};
use ledger_engine::{AccountAdmin, BalanceEngine, LedgerPoster, Reverser, SnapshotMaker};
use ledger_outbox::OutboxRelay;
use ledger_store::{LedgerStore, PostgresLedgerStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;

/// Binds the HTTP API and spawns the outbox relay and the balance
/// snapshotter as background tasks, then blocks until the listener
/// shuts down.
pub async fn run(config: Config) -> Result<()> {
    let store: Arc<dyn LedgerStore> =
        Arc::new(PostgresLedgerStore::connect(&config.database_url).await.context("connecting to postgres")?);
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidGen);

    let state = ledger_api::ApiState::new(
        store.clone(),
        Arc::new(AccountAdmin::new(store.clone(), clock.clone(), ids.clone())),
        Arc::new(LedgerPoster::new(store.clone(), clock.clone(), ids.clone())),
        Arc::new(Reverser::new(store.clone(), clock.clone(), ids.clone())),
        Arc::new(BalanceEngine::new(store.clone())),
    );
    let app = ledger_api::router(state);

    let bus: Arc<dyn ledger_bus::BusClient> = ledger_bus::InMemoryBusClient::shared();
    let relay = OutboxRelay::new(store.clone(), bus, config.relay.clone()).with_topics(config.bus_topics.clone());
    tokio::spawn(async move {
        relay.run().await;
    });

    let snapshot_maker = SnapshotMaker::new(store, clock, ids);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = snapshot_maker.create_snapshots(chrono::Utc::now()).await {
                tracing::warn!(error = %err, "snapshot run failed");
            }
        }
    });

    let listener = TcpListener::bind(&config.bind_addr).await.with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "ledger service listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
