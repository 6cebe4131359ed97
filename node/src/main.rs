// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SNP Vault Node
//!
//! Entry point for the `snp-node` binary. Parses CLI arguments, initializes
//! logging and metrics, builds the vault deployment, runs the block ticker,
//! and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the node
//! - `config`  — print the default three-tier deployment as JSON
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use snp_engine::clock::ManualClock;
use snp_engine::transfer::MemoryAssetLedger;
use snp_engine::{Deployment, DeploymentConfig, Principal};

use cli::{Commands, SnpNodeCli};
use metrics::NodeMetrics;

/// Height the devnet clock starts from.
const GENESIS_HEIGHT: u64 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SnpNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Config(args) => print_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Reads the deployment file, or falls back to the three default tiers.
/// `owner` replaces the owner of every vault when given.
fn load_deployment(path: Option<&Path>, owner: Option<&str>) -> Result<DeploymentConfig> {
    let mut config = match path {
        Some(path) => DeploymentConfig::load(path)
            .with_context(|| format!("failed to load deployment from {}", path.display()))?,
        None => DeploymentConfig::three_tier(Principal::new(
            owner.unwrap_or(cli::DEFAULT_DEVNET_OWNER),
        )),
    };
    if let Some(owner) = owner {
        config.owner = Principal::new(owner);
    }
    Ok(config)
}

/// Starts the node: API server, metrics endpoint, and block ticker.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format.into());

    let config = load_deployment(args.config.as_deref(), args.owner.as_deref())?;
    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        block_time_ms = args.block_time_ms,
        owner = %config.owner,
        vaults = config.vaults.len(),
        devnet = args.devnet,
        "starting snp-node"
    );

    // --- Engine ---
    let clock = Arc::new(ManualClock::new(GENESIS_HEIGHT));
    let ledger = Arc::new(MemoryAssetLedger::new());
    let deployment = Arc::new(
        Deployment::from_config(config, ledger.clone(), clock.clone())
            .context("failed to build vault deployment")?,
    );
    for vault in deployment.vaults() {
        tracing::info!(
            vault = %vault.id(),
            symbol = vault.get_symbol(),
            fee_bps = vault.config().performance_fee_bps,
            "vault ready"
        );
    }

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.block_height.set(GENESIS_HEIGHT as i64);
    node_metrics.refresh(&deployment).await;

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        deployment: Arc::clone(&deployment),
        clock: Arc::clone(&clock),
        ledger,
        devnet: args.devnet,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
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

    // --- Block ticker ---
    // One devnet block per interval; gauges refresh after each.
    let block_time = Duration::from_millis(args.block_time_ms.max(1));
    let ticker_clock = Arc::clone(&clock);
    let ticker_metrics = Arc::clone(&node_metrics);
    let ticker_deployment = Arc::clone(&deployment);
    let block_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(block_time);
        interval.tick().await;
        loop {
            interval.tick().await;
            let height = ticker_clock.advance();
            ticker_metrics.block_height.set(height as i64);
            ticker_metrics.blocks_total.inc();
            ticker_metrics.refresh(&ticker_deployment).await;
            tracing::debug!(height, "block");
        }
    });

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

    block_loop.abort();
    tracing::info!("snp-node stopped");
    Ok(())
}

/// Prints the default deployment so it can be edited and passed to `run`.
fn print_config(args: cli::ConfigArgs) -> Result<()> {
    let config = DeploymentConfig::three_tier(Principal::new(args.owner));
    let json = serde_json::to_string_pretty(&config).context("failed to encode deployment")?;
    println!("{}", json);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("snp-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc    {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed the corresponding branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
