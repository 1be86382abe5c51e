//! The [`Ballot`] facade: wiring, public operations, and ordered shutdown.
//!
//! [`Ballot::start`] spawns three tasks:
//!
//! - the [`VoteApplier`], sole writer of the tally
//! - the [`RegistryOwner`](crate::registry::RegistryOwner), sole owner of the subscriber set
//! - a shutdown coordinator that sequences the two
//!
//! Shutdown order: stop accepting votes, drain and apply the queue, stop
//! accepting registry mutations, flush queued updates, close every handle,
//! release the workers. Any number of callers may await
//! [`Ballot::shutdown`]; they all receive the same report.

use std::collections::BTreeSet;
use std::sync::Arc;

use ballot_types::{BallotStatus, Candidate, SubscriberId};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::applier::{ApplierReport, VoteApplier};
use crate::broadcast::update_lane;
use crate::config::BallotConfig;
use crate::error::BallotError;
use crate::handle::Subscription;
use crate::queue::{vote_queue, VoteQueue};
use crate::registry::{registry, RegistryClient, RegistryReport};
use crate::session::{Session, SessionExit, SessionSettings, SessionTransport};
use crate::snapshot::{snapshot_cell, SnapshotReader};
use crate::stats::BallotStats;
use crate::tally::TallyStore;

/// Combined report of a completed shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// What the applier did.
    pub applier: ApplierReport,
    /// What the registry owner did.
    pub registry: RegistryReport,
}

/// Handle to a running ballot. Cheap to clone; every clone talks to the
/// same workers.
#[derive(Debug, Clone)]
pub struct Ballot {
    queue: VoteQueue,
    registry: RegistryClient,
    snapshots: SnapshotReader,
    candidates: Arc<BTreeSet<String>>,
    validate_on_submit: bool,
    session_settings: SessionSettings,
    stats: Arc<BallotStats>,
    shutdown: CancellationToken,
    sessions: CancellationToken,
    done: watch::Receiver<Option<ShutdownReport>>,
    started_at: DateTime<Utc>,
}

impl Ballot {
    /// Spawn the ballot workers on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(config: &BallotConfig) -> Self {
        let stats = Arc::new(BallotStats::new());
        let tally = TallyStore::new(config.ballot.candidates.iter().cloned());
        let candidates: Arc<BTreeSet<String>> =
            Arc::new(config.ballot.candidates.iter().cloned().collect());

        let queue_capacity = config.queue.effective_capacity();
        let buffer_capacity = config.subscribers.effective_buffer_capacity();

        let (publisher, snapshots) = snapshot_cell(tally.snapshot());
        let (queue, votes) = vote_queue(queue_capacity, Arc::clone(&stats));
        let (broadcaster, updates) =
            update_lane(config.subscribers.update_lane_capacity, Arc::clone(&stats));
        let (registry_client, owner) = registry(
            config.subscribers.command_capacity,
            buffer_capacity,
            updates,
            Arc::clone(&stats),
        );
        let applier = VoteApplier::new(tally, votes, publisher, broadcaster, Arc::clone(&stats));

        let shutdown = CancellationToken::new();
        let registry_shutdown = CancellationToken::new();
        let sessions = CancellationToken::new();

        let applier_task = tokio::spawn(applier.run(shutdown.clone()));
        let registry_task = tokio::spawn(owner.run(registry_shutdown.clone()));

        let (done_tx, done) = watch::channel(None);
        tokio::spawn(coordinate_shutdown(
            shutdown.clone(),
            applier_task,
            registry_shutdown,
            registry_task,
            sessions.clone(),
            done_tx,
        ));

        info!(
            candidates = candidates.len(),
            queue_capacity,
            buffer_capacity,
            validate_on_submit = config.ballot.validate_on_submit,
            "Ballot started"
        );

        Self {
            queue,
            registry: registry_client,
            snapshots,
            candidates,
            validate_on_submit: config.ballot.validate_on_submit,
            session_settings: SessionSettings {
                keep_alive: config.subscribers.keep_alive(),
                write_timeout: config.subscribers.write_timeout(),
            },
            stats,
            shutdown,
            sessions,
            done,
            started_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Votes
    // -----------------------------------------------------------------------

    /// Offer a vote without waiting. `Ok` means accepted for processing.
    ///
    /// # Errors
    ///
    /// - [`BallotError::Busy`] when the queue is full
    /// - [`BallotError::ShutdownInProgress`] once shutdown has begun
    /// - [`BallotError::UnknownCandidate`] when `validate_on_submit` is on
    ///   and the candidate does not exist
    pub fn submit_vote(&self, candidate: &str) -> Result<(), BallotError> {
        if self.validate_on_submit && !self.candidates.contains(candidate) {
            return Err(BallotError::UnknownCandidate(candidate.to_owned()));
        }
        self.queue.enqueue(candidate)
    }

    /// All candidates and their current tallies, ordered by name.
    pub fn snapshot(&self) -> Vec<Candidate> {
        self.snapshots.current()
    }

    /// A reader that can wait for the tally to reach a given state.
    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.snapshots.clone()
    }

    /// The fixed candidate names, ordered.
    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Subscribers
    // -----------------------------------------------------------------------

    /// Register a new subscriber handle.
    ///
    /// Pair every call with [`unsubscribe`](Self::unsubscribe). A handle
    /// whose [`Subscription`] is dropped without it stays registered until
    /// the next update finds it closed and evicts it.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] once the registry stops accepting
    /// mutations.
    pub async fn subscribe(&self) -> Result<Subscription, BallotError> {
        self.registry.subscribe().await
    }

    /// Remove and close a subscriber handle. Returns whether it was
    /// registered.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] once the registry has exited.
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<bool, BallotError> {
        self.registry.unsubscribe(id).await
    }

    /// Number of registered subscriber handles.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] once the registry has exited.
    pub async fn subscriber_count(&self) -> Result<usize, BallotError> {
        self.registry.count().await
    }

    /// Build a session loop for `transport` using the configured timings.
    pub fn session<T: SessionTransport>(&self, transport: T) -> Session<T> {
        Session::new(
            self.registry.clone(),
            self.snapshots.clone(),
            transport,
            self.session_settings,
        )
    }

    /// Run a session loop for `transport` until it ends.
    pub async fn run_session<T: SessionTransport>(
        &self,
        transport: T,
        cancel: CancellationToken,
    ) -> SessionExit {
        self.session(transport).run(cancel).await
    }

    /// A cancellation token for one session. Fires on its own once the
    /// ballot has fully shut down.
    pub fn session_token(&self) -> CancellationToken {
        self.sessions.child_token()
    }

    /// Configured session timings.
    pub const fn session_settings(&self) -> SessionSettings {
        self.session_settings
    }

    // -----------------------------------------------------------------------
    // Status and lifecycle
    // -----------------------------------------------------------------------

    /// Counters, subscriber count, and tallies for the status endpoint.
    pub async fn status(&self) -> BallotStatus {
        let subscribers = self.subscriber_count().await.unwrap_or(0);
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        BallotStatus {
            candidates: self.snapshot(),
            subscribers: u64::try_from(subscribers).unwrap_or(u64::MAX),
            counters: self.stats.snapshot(),
            shutting_down: self.is_shutting_down(),
            started_at: self.started_at,
            uptime_seconds: u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX),
        }
    }

    /// Shared counters.
    pub fn stats(&self) -> &BallotStats {
        &self.stats
    }

    /// When the ballot was started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Begin shutdown (if not already begun) and wait for it to complete.
    ///
    /// Idempotent: concurrent and repeated calls all return the same report.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown.cancel();
        let mut done = self.done.clone();
        let report = match done.wait_for(Option::is_some).await {
            Ok(report) => *report,
            Err(_closed) => {
                warn!("Shutdown coordinator exited without a report");
                None
            }
        };
        report.unwrap_or_default()
    }
}

/// Sequence the workers' shutdown once `shutdown` fires.
async fn coordinate_shutdown(
    shutdown: CancellationToken,
    applier: JoinHandle<ApplierReport>,
    registry_shutdown: CancellationToken,
    registry: JoinHandle<RegistryReport>,
    sessions: CancellationToken,
    done: watch::Sender<Option<ShutdownReport>>,
) {
    shutdown.cancelled().await;
    info!("Shutdown started, draining vote queue");

    let applier = applier.await.unwrap_or_else(|e| {
        error!(error = %e, "Vote applier task failed");
        ApplierReport::default()
    });

    info!(applied = applier.applied, "Vote queue drained, closing subscriber registry");
    registry_shutdown.cancel();

    let registry = registry.await.unwrap_or_else(|e| {
        error!(error = %e, "Subscriber registry task failed");
        RegistryReport::default()
    });
    sessions.cancel();

    let report = ShutdownReport { applier, registry };
    info!(
        applied = report.applier.applied,
        unknown = report.applier.unknown,
        handles_closed = report.registry.handles_closed,
        "Ballot shutdown complete"
    );
    done.send_replace(Some(report));
}
