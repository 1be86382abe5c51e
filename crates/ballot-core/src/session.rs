//! Per-observer session loop.
//!
//! A session registers a handle, sends a full snapshot, then relays
//! updates until something ends it:
//!
//! ```text
//! Registering ──► Streaming ──► Terminating ──► Closed
//!      │             ├─ update on handle  → write Data frame
//!      │             ├─ keep-alive tick   → write KeepAlive frame
//!      │             ├─ cancel token      → Terminating
//!      │             ├─ transport closed  → Terminating
//!      │             ├─ write failed      → Terminating
//!      │             └─ handle closed     → Terminating
//!      └─ registry refused ─────────────────────────► Closed
//! ```
//!
//! Leaving `Streaming` always sends `Remove` to the registry before the
//! session reports `Closed`, so no stale handle outlives its session.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::BallotError;
use crate::handle::{Subscription, UpdateMessage};
use crate::registry::RegistryClient;
use crate::snapshot::SnapshotReader;

/// One unit written to a subscriber's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A serialized payload: the initial snapshot array or one candidate.
    Data(UpdateMessage),
    /// An empty frame that keeps idle connections open.
    KeepAlive,
}

/// Where a session writes its frames.
///
/// Implementations must deliver each frame to the peer before `send`
/// resolves (flush per frame).
pub trait SessionTransport: Send {
    /// Write one frame.
    ///
    /// # Errors
    ///
    /// [`BallotError::TransportFailure`] if the peer can no longer be reached.
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), BallotError>> + Send;

    /// Resolves once the peer has disconnected.
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// A transport backed by a bounded channel. The receiving end is handed to
/// whatever actually talks to the peer; dropping it counts as a disconnect.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Frame>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the peer side reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl SessionTransport for ChannelTransport {
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), BallotError>> + Send {
        async move {
            self.tx
                .send(frame)
                .await
                .map_err(|_closed| BallotError::TransportFailure(String::from("peer disconnected")))
        }
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        self.tx.closed()
    }
}

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the registry to accept the handle.
    Registering,
    /// Relaying updates and keep-alives.
    Streaming,
    /// Unregistering the handle.
    Terminating,
    /// Done. Terminal.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The registry refused the handle (shutdown in progress).
    Rejected,
    /// The registry closed the handle (global shutdown).
    HandleClosed,
    /// The transport reported the peer gone.
    PeerDisconnected,
    /// A write failed or timed out.
    TransportFailed,
    /// The cancellation token fired.
    Cancelled,
}

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Interval between keep-alive frames.
    pub keep_alive: Duration,
    /// Upper bound on a single frame write, if any.
    pub write_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(60),
            write_timeout: None,
        }
    }
}

/// One observer's session.
#[derive(Debug)]
pub struct Session<T> {
    registry: RegistryClient,
    snapshots: SnapshotReader,
    transport: T,
    settings: SessionSettings,
    state: SessionState,
}

impl<T: SessionTransport> Session<T> {
    /// Prepare a session; nothing happens until [`run`](Self::run).
    pub const fn new(
        registry: RegistryClient,
        snapshots: SnapshotReader,
        transport: T,
        settings: SessionSettings,
    ) -> Self {
        Self {
            registry,
            snapshots,
            transport,
            settings,
            state: SessionState::Registering,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion.
    pub async fn run(mut self, cancel: CancellationToken) -> SessionExit {
        let mut subscription = match self.registry.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                debug!(error = %e, "Subscriber registration refused");
                self.transition(SessionState::Closed);
                return SessionExit::Rejected;
            }
        };
        let id = subscription.id();
        debug!(subscriber = %id, "Subscriber connected");
        self.transition(SessionState::Streaming);

        let exit = self.stream(&mut subscription, &cancel).await;

        self.transition(SessionState::Terminating);
        if let Err(e) = self.registry.unsubscribe(id).await {
            trace!(subscriber = %id, error = %e, "Registry already closed the handle");
        }
        self.transition(SessionState::Closed);
        debug!(subscriber = %id, exit = ?exit, "Subscriber disconnected");
        exit
    }

    async fn stream(
        &mut self,
        subscription: &mut Subscription,
        cancel: &CancellationToken,
    ) -> SessionExit {
        let snapshot = match serde_json::to_string(&self.snapshots.current()) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize initial snapshot");
                return SessionExit::TransportFailed;
            }
        };
        if let Err(exit) = self.write(Frame::Data(snapshot.into())).await {
            return exit;
        }

        let period = self.settings.keep_alive;
        let mut keep_alive = tokio::time::interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return SessionExit::Cancelled,
                () = self.transport.closed() => return SessionExit::PeerDisconnected,
                message = subscription.recv() => match message {
                    Some(message) => {
                        if let Err(exit) = self.write(Frame::Data(message)).await {
                            return exit;
                        }
                    }
                    None => return SessionExit::HandleClosed,
                },
                _ = keep_alive.tick() => {
                    if let Err(exit) = self.write(Frame::KeepAlive).await {
                        return exit;
                    }
                }
            }
        }
    }

    async fn write(&mut self, frame: Frame) -> Result<(), SessionExit> {
        let result = match self.settings.write_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.send(frame))
                .await
                .unwrap_or_else(|_elapsed| {
                    Err(BallotError::TransportFailure(String::from("write timed out")))
                }),
            None => self.transport.send(frame).await,
        };
        result.map_err(|e| {
            debug!(error = %e, "Subscriber write failed");
            SessionExit::TransportFailed
        })
    }

    fn transition(&mut self, next: SessionState) {
        trace!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }
}
