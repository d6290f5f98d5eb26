//! backend-pool-sync
//!
//! Drives the batched backend pool reconciler against an in-memory cloud network API.
//!
//! # Architecture Overview
//!
//! ```text
//!   events (JSON lines)          ┌───────────────────────────────────────────────┐
//!   ─────────────────────────────┼─▶ membership ──▶ diff engine ──▶ reconciler   │
//!     node / service / endpoints │   node table       │             queue         │
//!                                │   routing table    │               │ tick      │
//!                                │                    ▼               ▼           │
//!                                │             AddIps / RemoveIps   per-pool task  │
//!                                │                                    │           │
//!                                │                                    ▼           │
//!                                │                         cloud network API      │
//!                                │                         (fetch / merge / put)  │
//!                                └───────────────────────────────────────────────┘
//! ```
//!
//! Ctrl-C stops the loop after the current drain cycle; operations still queued are
//! withdrawn. At end of input the process waits for every queued operation to resolve,
//! then prints the resulting pools as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use backend_pool_sync::cloud::{InMemoryNetworkApi, PoolDefinition};
use backend_pool_sync::config::{load_config, validate_config, ConfigError, PoolSyncConfig};
use backend_pool_sync::lifecycle::{shutdown, signals, Shutdown};
use backend_pool_sync::membership::{ClusterEvent, EndpointDiffEngine, NodeIpResolver, ServiceRoutingTable};
use backend_pool_sync::observability::{logging, metrics};
use backend_pool_sync::reconciler::{BackendPoolUpdater, OperationHandle};

#[derive(Parser)]
#[command(name = "backend-pool-sync")]
#[command(about = "Batch endpoint membership changes into backend pool updates", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File of JSON-line events; stdin when omitted.
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Override reconciler.update_interval_secs.
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PoolSyncConfig::default(),
    };
    if let Some(secs) = cli.interval_secs {
        config.reconciler.update_interval_secs = secs;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("backend-pool-sync v0.1.0 starting");
    tracing::info!(
        update_interval_secs = config.reconciler.update_interval_secs,
        load_balancers = config.load_balancers.len(),
        services = config.services.len(),
        nodes = config.nodes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    // Seed shared state
    let api = Arc::new(InMemoryNetworkApi::new());
    for lb in &config.load_balancers {
        for pool in &lb.pools {
            api.insert_pool(
                &lb.name,
                PoolDefinition::with_ips(pool.name.clone(), pool.addresses.iter().copied()),
            );
        }
    }

    let routes = ServiceRoutingTable::new();
    for svc in &config.services {
        routes.set_local(svc.service_name()?, svc.route());
    }

    let nodes = NodeIpResolver::new();
    for node in &config.nodes {
        nodes.set_node_ips(&node.name, node.ips.iter().copied());
    }

    let updater = BackendPoolUpdater::new(api.clone(), config.reconciler.update_interval())
        .with_routing_table(routes.clone());
    let engine = EndpointDiffEngine::new(routes, nodes, updater.clone());

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_handler(shutdown.clone());
    let updater_task = tokio::spawn(updater.clone().run(shutdown.subscribe()));

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.events {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = input.lines();
    let mut stop = shutdown.subscribe();
    let mut waiters = JoinSet::new();
    let mut end_of_input = false;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match serde_json::from_str::<ClusterEvent>(&line) {
                    Ok(event) => {
                        for handle in engine.handle_cluster_event(event) {
                            waiters.spawn(report(handle));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, line = %line, "Skipping malformed event"),
                },
                None => {
                    end_of_input = true;
                    break;
                }
            },
            _ = shutdown::wait(&mut stop) => break,
        }
    }

    if end_of_input {
        tracing::info!(pending = updater.pending(), "End of input, waiting for queued operations");
        tokio::select! {
            _ = async { while waiters.join_next().await.is_some() {} } => {}
            _ = shutdown::wait(&mut stop) => {}
        }
    }

    shutdown.trigger();
    updater_task.await?;
    while waiters.join_next().await.is_some() {}

    println!("{}", serde_json::to_string_pretty(&api.snapshot())?);

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn report(handle: OperationHandle) {
    let id = handle.id();
    match handle.wait().await {
        Ok(outcome) => tracing::info!(operation_id = %id, outcome = outcome.as_str(), "Operation completed"),
        Err(e) => tracing::warn!(operation_id = %id, error = %e, "Operation failed"),
    }
}

