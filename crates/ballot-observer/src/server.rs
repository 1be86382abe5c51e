//! HTTP server lifecycle management.
//!
//! [`bind`] claims the listening socket; [`serve`] runs the router on it
//! until the shutdown token fires and every open connection (including
//! event streams) has finished. [`start_server`] does both.

use std::net::SocketAddr;
use std::sync::Arc;

use ballot_core::config::ServerSettings;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Bind the listening socket described by `settings`.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is malformed or the port
/// cannot be bound.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve requests on `listener` until `shutdown` fires.
///
/// New connections stop being accepted as soon as the token is cancelled;
/// the future resolves once in-flight requests complete.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Serve(format!("listener has no address: {e}")))?;
    info!(%addr, "Ballot server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Ballot server stopped");
    Ok(())
}

/// Bind and serve in one step.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(
    settings: &ServerSettings,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = bind(settings).await?;
    serve(listener, state, shutdown).await
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
