//! Server startup helper for the binary.
//!
//! Provides [`spawn_observer`] which binds the listener eagerly (so a busy
//! port fails startup instead of a background task) and then serves on a
//! background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ballot_observer::startup::spawn_observer;
//! use ballot_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(ballot));
//! let (handle, addr) = spawn_observer(&config.server, state, token.clone()).await?;
//! // The server is now running. Cancel `token` and await `handle` to stop it.
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use ballot_core::config::ServerSettings;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the listener and serve on a background task.
///
/// Returns the task handle and the address actually bound (useful when
/// `settings.port` is `0`). The task ends after `shutdown` is cancelled
/// and every open connection has closed.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_observer(
    settings: &ServerSettings,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(JoinHandle<()>, SocketAddr), StartupError> {
    let listener = server::bind(settings).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("listener has no address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Ballot server exited with error");
        }
    });

    tracing::info!(%addr, "Ballot server spawned on background task");

    Ok((handle, addr))
}
