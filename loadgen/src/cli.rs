//! # CLI Interface
//!
//! Defines the command-line argument structure for `txpulse` using `clap`
//! derive. Supports four subcommands: `run`, `check-config`, `keygen`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Synthetic transaction load for a ledger node.
///
/// Periodically signs and submits transfers from the configured accounts,
/// and optionally serves a faucet endpoint that issues transfers on demand
/// from the same nonce sequence.
#[derive(Parser, Debug)]
#[command(
    name = "txpulse",
    about = "Synthetic transaction load generator and faucet",
    version,
    propagate_version = true
)]
pub struct TxPulseCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the txpulse binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prime nonces, then run the generator (and the faucet, if enabled).
    Run(RunArgs),
    /// Parse and validate a config file, print a summary, and exit.
    CheckConfig(CheckConfigArgs),
    /// Generate a fresh Ed25519 keypair for a sender entry.
    Keygen,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the JSON config file.
    #[arg(long, short = 'c', env = "TXPULSE_CONFIG")]
    pub config: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "TXPULSE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Stop after this many generator ticks. Runs until interrupted when
    /// omitted.
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Serve `/metrics` on a dedicated address, e.g. `127.0.0.1:9100`.
    ///
    /// The faucet listener always serves `/metrics` as well; this is for
    /// deployments that run with the faucet disabled.
    #[arg(long, env = "TXPULSE_METRICS_LISTEN")]
    pub metrics_listen: Option<String>,
}

/// Arguments for the `check-config` subcommand.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the JSON config file.
    #[arg(long, short = 'c', env = "TXPULSE_CONFIG")]
    pub config: PathBuf,
}
