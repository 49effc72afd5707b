// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txpulse
//!
//! Entry point for the `txpulse` binary. Parses CLI arguments, initializes
//! logging and metrics, primes nonces from the node, then runs the generator
//! loop and (optionally) the faucet server until interrupted.
//!
//! The binary supports four subcommands:
//!
//! - `run`: prime nonces, run the generator and the faucet
//! - `check-config`: validate a config file and print a summary
//! - `keygen`: print a fresh keypair as a sender entry
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::{Instant, MissedTickBehavior};

use txpulse_protocol::config::LoadConfig;
use txpulse_protocol::crypto::keys::AccountKeypair;
use txpulse_protocol::crypto::signatures::Ed25519Signer;
use txpulse_protocol::load::{Issuer, LoadGenerator};
use txpulse_protocol::network::NodeClient;
use txpulse_protocol::nonce::NonceAllocator;
use txpulse_protocol::transaction::DEFAULT_TX_VERSION;

use cli::{Commands, TxPulseCli};
use logging::LogFormat;
use metrics::{InstrumentedSink, LoadMetrics, SharedMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TxPulseCli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::CheckConfig(args) => check_config(args),
        Commands::Keygen => keygen(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Primes every configured account, then serves the faucet and drives the
/// generator until a shutdown signal or the tick limit.
async fn run(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_DIRECTIVE,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let config = LoadConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    tracing::info!(
        node_url = %config.node_url,
        senders = config.senders.len(),
        tick_ms = config.tick().as_millis() as u64,
        transactions_per_sender = config.transactions_per_sender(),
        faucet = config.faucet.enabled,
        "starting txpulse"
    );

    // --- Metrics ---
    let load_metrics = Arc::new(LoadMetrics::new().context("failed to create metrics registry")?);

    // --- Node client ---
    let client = Arc::new(
        NodeClient::new(&config.node_url, config.request_timeout())
            .context("failed to build node client")?,
    );

    // --- Nonce priming ---
    // Must finish before anything can issue.
    let allocator = Arc::new(NonceAllocator::new());
    let accounts = config.accounts();
    allocator
        .prime(client.as_ref(), &accounts)
        .await
        .context("failed to prime nonces")?;
    tracing::info!(accounts = accounts.len(), "nonces primed");

    // --- Issuance pipeline ---
    let sink = Arc::new(InstrumentedSink::new(client, &load_metrics));
    let issuer = Arc::new(Issuer::new(allocator, sink, Arc::new(Ed25519Signer)));

    // --- Faucet server ---
    let faucet_server = if config.faucet.enabled {
        let sender = config.faucet_sender()?.clone();
        let state = api::AppState {
            issuer: Arc::clone(&issuer),
            sender: Arc::new(sender),
            faucet_payload: config.faucet.payload.clone(),
            default_payload: config.default_payload.clone(),
            metrics: Arc::clone(&load_metrics),
        };
        let addr = config.faucet_listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind faucet listener on {}", addr))?;
        tracing::info!(sender = %config.faucet.sender_name, "faucet listening on {}", addr);
        Some((listener, api::create_router(state)))
    } else {
        None
    };

    // --- Dedicated metrics server ---
    let metrics_server = match &args.metrics_listen {
        Some(addr) => {
            let router = axum::Router::new()
                .route("/metrics", axum::routing::get(metrics::metrics_handler))
                .with_state(Arc::clone(&load_metrics));
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind metrics listener on {}", addr))?;
            tracing::info!("metrics server listening on {}", addr);
            Some((listener, router))
        }
        None => None,
    };

    // --- Generator ---
    let generator = LoadGenerator::new(issuer, &config);

    tokio::select! {
        res = serve_or_idle(faucet_server) => {
            if let Err(e) = res {
                tracing::error!("faucet server error: {}", e);
            }
        }
        res = serve_or_idle(metrics_server) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = generator_loop(&generator, config.tick(), args.max_ticks, Arc::clone(&load_metrics)) => {}
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!(
        ticks = load_metrics.ticks_total.get(),
        "txpulse stopped"
    );
    Ok(())
}

/// Serves `router` on `listener`, or waits forever when there is nothing to
/// serve.
async fn serve_or_idle(server: Option<(TcpListener, axum::Router)>) -> std::io::Result<()> {
    match server {
        Some((listener, router)) => axum::serve(listener, router).await,
        None => std::future::pending().await,
    }
}

/// Runs a tick every `tick`, starting one interval after the call. Missed
/// ticks are skipped rather than bunched up. Returns after `max_ticks`
/// ticks when a limit is given.
async fn generator_loop(
    generator: &LoadGenerator,
    tick: Duration,
    max_ticks: Option<u64>,
    metrics: SharedMetrics,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut ticks: u64 = 0;
    loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            tracing::info!(ticks, "tick limit reached");
            return;
        }

        interval.tick().await;
        let report = generator.run_tick().await;
        ticks += 1;
        metrics.record_tick(&report);

        tracing::debug!(
            tick = ticks,
            submitted = report.submitted(),
            failed = report.failed(),
            skipped = report.skipped(),
            "tick finished"
        );
    }
}

/// Validates a config file and prints what `run` would do with it.
fn check_config(args: cli::CheckConfigArgs) -> Result<()> {
    let config = LoadConfig::load(&args.config)
        .with_context(|| format!("invalid config {}", args.config.display()))?;

    println!("Config OK: {}", args.config.display());
    println!("  Node URL              : {}", config.node_url);
    println!("  Tick                  : {:?}", config.tick());
    println!("  Transactions / sender : {}", config.transactions_per_sender());
    println!("  Request timeout       : {:?}", config.request_timeout());
    println!("  Senders               : {}", config.senders.len());
    for sender in &config.senders {
        println!(
            "    - {:<16} {} ({} recipients, amount {}, fee {})",
            sender.name,
            sender.public_key,
            sender.recipients.len(),
            sender.amount,
            sender.fee
        );
    }
    if config.faucet.enabled {
        println!(
            "  Faucet                : {} from {}",
            config.faucet_listen_addr(),
            config.faucet.sender_name
        );
    } else {
        println!("  Faucet                : disabled");
    }

    Ok(())
}

/// Prints a fresh keypair as a ready-to-edit sender entry.
fn keygen() -> Result<()> {
    let keypair = AccountKeypair::generate();
    let entry = serde_json::json!({
        "name": "",
        "publicKey": keypair.public_key_hex(),
        "privateKey": keypair.secret_key_hex(),
        "recipients": [],
        "amount": 0,
        "fee": 0,
        "version": DEFAULT_TX_VERSION,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&entry).context("failed to render sender entry")?
    );
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("txpulse    {}", env!("CARGO_PKG_VERSION"));
    println!("tx version {}", DEFAULT_TX_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never fires.
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
            Ok(mut sig) => {
                sig.recv().await;
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
