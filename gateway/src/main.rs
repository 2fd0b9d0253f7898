// Copyright (c) 2026 Umbra Labs. MIT License.
// See LICENSE for details.

//! # Umbra Registry Gateway
//!
//! Entry point for the `umbra-gateway` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the order lifecycle manager to
//! its collaborators, and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the gateway
//! - `status`  — query a running gateway's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use umbra_core::external::{DevAvailabilityOracle, DevProvisioner, DevRecordBackend};
use umbra_core::order::ManagerConfig;
use umbra_core::{OrderLifecycleManager, OwnershipRegistry};

use cli::{Commands, UmbraGatewayCli};
use logging::LogFormat;
use metrics::GatewayMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = UmbraGatewayCli::parse();

    match cli.command {
        Commands::Run(args) => run_gateway(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full gateway: API server, metrics endpoint, and the
/// background expiry sweeper.
async fn run_gateway(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "umbra_gateway=info,umbra_core=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        payment_window_mins = args.payment_window_mins,
        "starting umbra-gateway"
    );

    // --- Collaborators ---
    // Dev implementations until the registrar and settlement integrations
    // land; the settlement watcher drives the callback endpoints either way.
    let oracle = Arc::new(DevAvailabilityOracle::new(args.dev_price));
    let provisioner = Arc::new(DevProvisioner::new());
    let records = Arc::new(DevRecordBackend::new());

    // --- Ownership registry ---
    let registry = Arc::new(OwnershipRegistry::new());

    // --- Lifecycle manager ---
    let manager = Arc::new(OrderLifecycleManager::with_config(
        oracle,
        provisioner,
        Arc::clone(&registry),
        ManagerConfig {
            create_cooldown: umbra_core::config::CREATE_COOLDOWN,
            payment_window: std::time::Duration::from_secs(args.payment_window_mins * 60),
        },
    ));

    // --- Metrics ---
    let gateway_metrics = Arc::new(GatewayMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (scheme v{})",
            env!("CARGO_PKG_VERSION"),
            umbra_core::config::COMMITMENT_SCHEME_VERSION,
        ),
        manager: Arc::clone(&manager),
        registry,
        records,
        metrics: Arc::clone(&gateway_metrics),
        started_at: chrono::Utc::now(),
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
        .with_state(Arc::clone(&gateway_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Expiry sweeper ---
    // Walks every order on an interval and expires the overdue unpaid ones,
    // marking their deposit targets dead.
    let sweep_manager = Arc::clone(&manager);
    let sweep_metrics = Arc::clone(&gateway_metrics);
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(umbra_core::config::EXPIRY_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = sweep_manager.expire_overdue().await;
            if expired > 0 {
                sweep_metrics.orders_expired_total.inc_by(expired as u64);
                tracing::info!(expired, "expiry sweep completed");
            }
            sweep_metrics
                .tracked_orders
                .set(sweep_manager.order_count() as i64);
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

    sweeper.abort();
    tracing::info!("umbra-gateway stopped");
    Ok(())
}

/// Queries a running gateway's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.api_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET without pulling in a full client crate — the status
/// subcommand is the only consumer.
async fn http_get(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow::anyhow!("only http:// URLs are supported"))?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (h, p.parse::<u16>().context("bad port in URL")?),
        None => (authority, 80),
    };

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("umbra-gateway {}", env!("CARGO_PKG_VERSION"));
    println!(
        "commitment scheme v{}",
        umbra_core::config::COMMITMENT_SCHEME_VERSION
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
