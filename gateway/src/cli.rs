//! # CLI Interface
//!
//! Defines the command-line argument structure for `umbra-gateway` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`.

use clap::{Parser, Subcommand};

/// Umbra registry order gateway.
///
/// Serves the HTTP API for purchase orders, receives payment callbacks
/// from the settlement watcher, fulfills paid orders, and authorizes
/// record changes against ownership commitments.
#[derive(Parser, Debug)]
#[command(
    name = "umbra-gateway",
    about = "Umbra registry order gateway",
    version,
    propagate_version = true
)]
pub struct UmbraGatewayCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the gateway binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway.
    Run(RunArgs),
    /// Query the status of a running gateway via its API endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP API.
    #[arg(long, env = "UMBRA_API_PORT", default_value_t = umbra_core::config::DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "UMBRA_METRICS_PORT", default_value_t = umbra_core::config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Payment window in minutes before unpaid orders expire.
    #[arg(long, env = "UMBRA_PAYMENT_WINDOW_MINS", default_value_t = 30)]
    pub payment_window_mins: u64,

    /// Flat price quoted by the development availability oracle, in atomic
    /// units. Replaced by a real registrar integration in production.
    #[arg(long, env = "UMBRA_DEV_PRICE", default_value_t = 120_000)]
    pub dev_price: u64,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "UMBRA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running gateway.
    #[arg(long, default_value = "http://127.0.0.1:8640")]
    pub api_url: String,
}
