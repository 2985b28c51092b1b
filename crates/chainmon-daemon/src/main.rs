//! chainmon daemon entry point.
//!
//! Loads the TOML configuration, opens the event store and spawns one set
//! of periodic units per agent: monitors on the agent's push cadence,
//! checkers on the fleet-wide check interval. Runs until SIGINT.

mod config;
mod scheduler;

use anyhow::Context;
use chainmon_alert::dispatch::AlertDispatcher;
use chainmon_alert::routing::AlertRouting;
use chainmon_common::TENDERMINT_SERVICE;
use chainmon_monitor::backfill::Backfiller;
use chainmon_monitor::net_info::NetInfoMonitor;
use chainmon_monitor::status::StatusMonitor;
use chainmon_notify::webhook::WebhookTransport;
use chainmon_rpc::{ChainRpc, HttpRpcClient};
use chainmon_storage::sqlite::SqliteEventStore;
use chainmon_storage::EventStore;
use chrono::Utc;
use config::{Config, MonitorKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chainmon.toml".to_string());
    let config = Config::load(Path::new(&path))?;
    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn EventStore> = Arc::new(
        SqliteEventStore::open(&config.database.path, &config.run_id)
            .context("opening event store")?,
    );
    let dispatcher = Arc::new(build_dispatcher(&config, Arc::clone(&store))?);

    let mut scheduler = scheduler::Scheduler::new();
    for agent in &config.agents {
        let rpc: Arc<dyn ChainRpc> = Arc::new(
            HttpRpcClient::new(
                &agent.rpc_url,
                Duration::from_secs(config.rpc_timeout_secs),
                config.rpc_retries,
            )
            .with_context(|| format!("building rpc client for agent '{}'", agent.name))?,
        );
        let push = Duration::from_secs(agent.push_interval_secs);

        if config.monitors.contains(&MonitorKind::Status) {
            let monitor = Arc::new(StatusMonitor::new(
                Arc::clone(&rpc),
                Arc::clone(&store),
                &agent.name,
                &config.run_id,
            ));
            let name = agent.name.clone();
            scheduler.spawn_periodic("status-monitor", push, move || {
                let monitor = Arc::clone(&monitor);
                let name = name.clone();
                async move {
                    if let Err(e) = monitor.sample().await {
                        tracing::error!(agent = %name, error = %e, "status sample failed");
                    }
                }
            });
        }

        if config.monitors.contains(&MonitorKind::NetInfo) {
            let monitor = Arc::new(NetInfoMonitor::new(
                Arc::clone(&rpc),
                Arc::clone(&store),
                &agent.name,
                &config.run_id,
            ));
            let name = agent.name.clone();
            scheduler.spawn_periodic("net-info-monitor", push, move || {
                let monitor = Arc::clone(&monitor);
                let name = name.clone();
                async move {
                    if let Err(e) = monitor.sample().await {
                        tracing::error!(agent = %name, error = %e, "net-info sample failed");
                    }
                }
            });
        }

        if config.monitors.contains(&MonitorKind::Backfill) {
            let backfiller = Arc::new(Backfiller::new(
                Arc::clone(&rpc),
                Arc::clone(&store),
                &agent.name,
                &config.run_id,
                agent.push_interval_secs,
                agent.backfill_max_concurrency,
            ));
            let name = agent.name.clone();
            scheduler.spawn_periodic("commit-backfill", push, move || {
                let backfiller = Arc::clone(&backfiller);
                let name = name.clone();
                async move {
                    if let Err(e) = backfiller.run_once().await {
                        tracing::error!(agent = %name, error = %e, "backfill cycle failed");
                    }
                }
            });
        }

        spawn_checkers(&mut scheduler, &config, agent, Arc::clone(&store), Arc::clone(&dispatcher));
    }

    tracing::info!(
        run_id = %config.run_id,
        agents = config.agents.len(),
        "chainmon daemon started"
    );
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown signal received");
    scheduler.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

fn build_dispatcher(config: &Config, store: Arc<dyn EventStore>) -> anyhow::Result<AlertDispatcher> {
    let mut endpoints = HashMap::new();
    for entry in &config.alarmers {
        endpoints.insert(entry.alarmer.name.clone(), entry.url.clone());
    }
    for agent in &config.agents {
        for entry in &agent.alarmers {
            endpoints.insert(entry.alarmer.name.clone(), entry.url.clone());
        }
    }
    let transport =
        Arc::new(WebhookTransport::new(endpoints).context("building webhook transport")?);

    let mut routing = AlertRouting::new(
        config.alerts.clone(),
        config.alarmers.iter().map(|a| a.alarmer.clone()).collect(),
    );
    for agent in &config.agents {
        routing.set_agent_entries(
            &agent.name,
            agent.alerts.clone(),
            agent.alarmers.iter().map(|a| a.alarmer.clone()).collect(),
        );
    }

    Ok(AlertDispatcher::new(
        routing,
        store,
        transport,
        &config.run_id,
        TENDERMINT_SERVICE,
    ))
}

fn spawn_checkers(
    scheduler: &mut scheduler::Scheduler,
    config: &Config,
    agent: &config::AgentConfig,
    store: Arc<dyn EventStore>,
    dispatcher: Arc<AlertDispatcher>,
) {
    let thresholds = config.default_checker.merged_with(&agent.checker);
    let interval = Duration::from_secs(config.check_interval_secs);

    // Each checker gets its own periodic unit so a slow dispatch in one
    // cannot starve the others.
    for kind in config.checkers.iter().copied() {
        let store = Arc::clone(&store);
        let dispatcher = Arc::clone(&dispatcher);
        let thresholds = thresholds.clone();
        let name = agent.name.clone();

        scheduler.spawn_periodic(kind.as_str(), interval, move || {
            let store = Arc::clone(&store);
            let dispatcher = Arc::clone(&dispatcher);
            let thresholds = thresholds.clone();
            let name = name.clone();
            async move {
                match kind.run(store.as_ref(), &thresholds, &name, Utc::now()) {
                    Ok(candidates) => {
                        for candidate in candidates {
                            dispatcher.dispatch(&candidate).await;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            agent = %name,
                            checker = %kind,
                            error = %e,
                            "checker pass failed"
                        );
                    }
                }
            }
        });
    }
}
