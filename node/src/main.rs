// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # nftlend Node
//!
//! Entry point for the `nftlend-node` binary. Parses CLI arguments,
//! initializes logging and metrics, deploys the loan engine against
//! in-memory ledgers, and serves the REST API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     : start the API and metrics servers
//! - `params`  : validate lending parameters and print them as JSON
//! - `version` : print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use nftlend_protocol::clock::SystemClock;

use cli::{Commands, NftLendCli};
use logging::LogFormat;
use metrics::LendingMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NftLendCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Params(args) => print_params(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint. Runs until SIGINT or
/// SIGTERM.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    )?;

    let params = args.params.to_params();
    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        devnet = args.devnet,
        "starting nftlend-node"
    );

    // --- Metrics ---
    let lending_metrics =
        Arc::new(LendingMetrics::new().context("failed to register prometheus metrics")?);

    // --- Application state ---
    let app_state = api::AppState::in_memory(
        env!("CARGO_PKG_VERSION").to_string(),
        params,
        Arc::new(SystemClock),
        Arc::clone(&lending_metrics),
        args.devnet,
    )
    .context("invalid lending parameters")?;
    lending_metrics.observe_book(app_state.ledger.as_ref());

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&lending_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
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
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("nftlend-node stopped");
    Ok(())
}

/// Validates the parameter bundle and prints it to stdout as JSON.
fn print_params(args: cli::ParamsArgs) -> Result<()> {
    let params = args.to_params();
    params.validate().context("invalid lending parameters")?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    println!("max principal per loan: {}", params.max_principal());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("nftlend-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// A handler that fails to install never fires; the other one still does.
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
