// Copyright (c) 2026 Tally Labs. MIT License.
// See LICENSE for details.

//! # TALLY Node
//!
//! Entry point for the `tally-node` binary. Parses CLI arguments,
//! initializes logging and metrics, mines the genesis block, and serves
//! the HTTP API.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the node
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::signal;

use tally_ledger::consensus::{ConsensusResolver, HttpPeerClient};
use tally_ledger::ledger::Ledger;
use tally_ledger::miner::MineControl;
use tally_ledger::registry::NodeRegistry;

use cli::{Commands, TallyNodeCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full node: ledger with mined genesis, peer registry, API
/// server, and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "tally_node=info,tally_ledger=info,tower_http=debug",
        args.log_format,
    );

    // Per-process identity, reported by /health and carried in log lines.
    let node_id = uuid::Uuid::new_v4().simple().to_string();

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        node_id = %node_id,
        "starting tally-node"
    );

    // --- Ledger ---
    // Genesis mining is a CPU-bound digest search; keep it off the
    // async executor.
    let ledger = tokio::task::spawn_blocking(Ledger::new)
        .await
        .context("genesis mining task failed")?;
    let ledger = Arc::new(RwLock::new(ledger));

    // --- Peer registry ---
    let registry = Arc::new(NodeRegistry::new());
    if let Some(peers) = &args.peers {
        for raw in peers.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match registry.register(raw) {
                Ok(canonical) => tracing::info!(peer = %canonical, "startup peer registered"),
                Err(e) => tracing::warn!(address = raw, error = %e, "startup peer rejected"),
            }
        }
    }

    // --- Consensus ---
    let client = Arc::new(HttpPeerClient::new().context("failed to build peer HTTP client")?);
    let resolver = Arc::new(ConsensusResolver::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
        client,
    ));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics.chain_height.set(ledger.read().len() as i64);
    node_metrics.registered_peers.set(registry.len() as i64);

    // --- Mining policy ---
    // Bounded so an API-triggered search cannot hold a request open
    // forever; the shared cancel token is tripped at shutdown.
    let mine_control = MineControl::bounded(args.max_proof_iterations);

    // --- Application state ---
    let app_state = api::AppState {
        node_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger,
        registry,
        resolver,
        metrics: Arc::clone(&node_metrics),
        mine_control: mine_control.clone(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    // Stop any proof search still running on a blocking thread.
    mine_control.cancel.cancel();
    tracing::info!("tally-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tally-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "difficulty  {} leading zeros",
        tally_ledger::config::DIFFICULTY_PREFIX.len()
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
