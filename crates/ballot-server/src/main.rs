//! Live ballot server binary.
//!
//! Wires the ballot core to the HTTP layer and runs until `Ctrl-C` or
//! `SIGTERM`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`BALLOT_CONFIG` or `ballot-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Start the ballot workers
//! 4. Bind and spawn the HTTP server
//! 5. Wait for a termination signal
//!
//! # Shutdown Sequence
//!
//! 1. Stop accepting HTTP connections
//! 2. Drain the vote queue and close every subscriber
//! 3. Wait (bounded) for open responses to finish
//! 4. Log the shutdown report

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ballot_core::{Ballot, BallotConfig};
use ballot_observer::state::AppState;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "ballot-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the listener cannot be
/// set up.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = load_config().context("loading configuration")?;

    // 2. Initialize structured logging.
    init_logging(&config.logging.level).context("initializing logging")?;
    info!(
        candidates = config.ballot.candidates.len(),
        host = config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Start the ballot.
    let ballot = Ballot::start(&config);

    // 4. Start the HTTP server.
    let http_shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(ballot.clone()));
    let (server, addr) =
        ballot_observer::spawn_observer(&config.server, state, http_shutdown.clone())
            .await
            .map_err(AppError::from)
            .context("starting HTTP server")?;
    info!(%addr, "ballot-server ready");

    // 5. Wait for a termination signal.
    wait_for_signal().await;
    info!("Termination signal received, shutting down");

    http_shutdown.cancel();
    let report = ballot.shutdown().await;

    let grace = config.server.shutdown_timeout();
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "HTTP server task failed"),
        Err(_elapsed) => warn!(
            timeout_secs = grace.as_secs(),
            "HTTP connections still open after grace period"
        ),
    }

    info!(
        applied = report.applier.applied,
        unknown = report.applier.unknown,
        drained_at_shutdown = report.applier.drained_at_shutdown,
        subscribers_closed = report.registry.handles_closed,
        "ballot-server shutdown complete"
    );
    Ok(())
}

/// Load configuration from `BALLOT_CONFIG`, then `ballot-config.yaml`,
/// falling back to defaults when neither exists.
fn load_config() -> Result<BallotConfig, AppError> {
    let path = std::env::var_os("BALLOT_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        return Ok(BallotConfig::from_file(&path)?);
    }

    let mut config = BallotConfig::default();
    config.server.apply_env_overrides()?;
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the config level.
fn init_logging(level: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_unset) => EnvFilter::try_new(level).map_err(|e| AppError::LogFilter {
            filter: level.to_owned(),
            message: e.to_string(),
        })?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

/// Resolve on `Ctrl-C` or, on Unix, `SIGTERM`.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
