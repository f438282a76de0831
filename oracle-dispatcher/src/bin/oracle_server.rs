//! Oracle fleet server binary
//!
//! Starts an in-process surety ledger, registers the oracle fleet and answers
//! status requests until Ctrl-C.

use anyhow::Context;
use async_trait::async_trait;
use oracle_dispatcher::{DispatcherConfig, EventHandler, EventSubscriber, OracleFleet};
use std::sync::Arc;
use surety_core::{spawn_surety_actor, treasury::InMemoryWallets, Config, EventRecord, SuretyEvent};

/// Logs finalized statuses and credited policies
struct SettlementLog;

#[async_trait]
impl EventHandler for SettlementLog {
    async fn handle(&self, record: EventRecord) -> oracle_dispatcher::Result<()> {
        match record.event {
            SuretyEvent::StatusFinalized { flight, status } => {
                tracing::info!(%flight, %status, code = status.code(), "flight status finalized");
            }
            SuretyEvent::InsuranceCredited {
                passenger,
                flight,
                amount,
            } => {
                tracing::info!(%passenger, %flight, %amount, "policy credited");
            }
            _ => {}
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if std::env::var("SURETY_LOG_JSON").is_ok() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting FlightSurety oracle server");

    // Load configuration
    let config = match std::env::var("SURETY_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading surety config from environment")?,
    };
    let dispatcher_config = match std::env::var("DISPATCHER_CONFIG") {
        Ok(path) => {
            DispatcherConfig::from_file(&path).with_context(|| format!("loading {}", path))?
        }
        Err(_) => DispatcherConfig::from_env().context("loading dispatcher config from environment")?,
    };

    let surety = spawn_surety_actor(config, Arc::new(InMemoryWallets::new()))?;
    tracing::info!(owner = %surety.owner(), "surety ledger started");

    let settlement = EventSubscriber::new(surety.clone(), "settlement-log");
    let settlement_task = tokio::spawn(settlement.subscribe(Arc::new(SettlementLog)));

    let fleet = OracleFleet::bootstrap(surety.clone(), &dispatcher_config).await?;
    tracing::info!(oracles = fleet.len(), "oracle fleet registered");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down oracle server");
    fleet.shutdown().await;
    settlement_task.abort();
    surety.shutdown().await?;
    tracing::debug!("{}", surety.metrics().gather_text());
    Ok(())
}
