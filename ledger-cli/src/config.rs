use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use ledger_bus::BusTopics;
use ledger_outbox::RelayConfig;

/// Process configuration, loaded once at startup. Required values fail
/// fast with a descriptive error; everything else falls back to the
/// documented default.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub relay: RelayConfig,
    pub bus_topics: BusTopics,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("LEDGER_DATABASE_URL")
            .context("LEDGER_DATABASE_URL must be set to a postgres connection string")?;

        let bind_addr = env::var("LEDGER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let poll_interval_ms = parse_env_u64("LEDGER_OUTBOX_POLL_INTERVAL_MS", 5000)?;
        let batch_size = parse_env_usize("LEDGER_OUTBOX_BATCH_SIZE", 100)?;
        let max_attempts = parse_env_u32("LEDGER_OUTBOX_MAX_ATTEMPTS", 5)?;
        let health_log_interval_ms = parse_env_u64("LEDGER_OUTBOX_HEALTH_LOG_INTERVAL_MS", 60_000)?;
        let per_attempt_timeout_ms = parse_env_u64("LEDGER_OUTBOX_PER_ATTEMPT_TIMEOUT_MS", 2000)?;

        let relay = RelayConfig {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
            max_attempts,
            health_log_interval: Duration::from_millis(health_log_interval_ms),
            per_attempt_timeout: Duration::from_millis(per_attempt_timeout_ms),
        };

        let bus_topics = BusTopics {
            posted: env::var("LEDGER_BUS_TOPIC_POSTED").unwrap_or_else(|_| BusTopics::default().posted),
            reversed: env::var("LEDGER_BUS_TOPIC_REVERSED").unwrap_or_else(|_| BusTopics::default().reversed),
        };

        Ok(Self { database_url, bind_addr, relay, bus_topics })
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("{key} must be a positive integer")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("{key} is not valid UTF-8")),
    }
}

fn parse_env_usize(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("{key} must be a positive integer")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("{key} is not valid UTF-8")),
    }
}

fn parse_env_u32(key: &str, default: u32) -> Result<u32> {
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("{key} must be a positive integer")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("{key} is not valid UTF-8")),
    }
}
