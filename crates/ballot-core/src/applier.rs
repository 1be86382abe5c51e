//! The vote applier: sole writer of the tally.
//!
//! One task drains the [`VoteQueue`](crate::queue::VoteQueue) in FIFO order.
//! For each known candidate it bumps the count, publishes the new snapshot,
//! and hands the record to the [`Broadcaster`]. Because nothing else ever
//! holds the [`TallyStore`], votes are linearized without locks.
//!
//! On shutdown the applier closes the queue to new submissions and applies
//! everything already accepted before returning.

use std::sync::Arc;

use ballot_types::Candidate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::error::BallotError;
use crate::queue::VoteSubmission;
use crate::snapshot::SnapshotPublisher;
use crate::stats::BallotStats;
use crate::tally::TallyStore;

/// Counts reported when the applier exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplierReport {
    /// Votes applied to the tally.
    pub applied: u64,
    /// Votes dropped because the candidate does not exist.
    pub unknown: u64,
    /// Votes that were still queued when shutdown began and were applied
    /// (or dropped as unknown) during the final drain.
    pub drained_at_shutdown: u64,
}

/// Single sequential worker owning the tally.
#[derive(Debug)]
pub struct VoteApplier {
    tally: TallyStore,
    votes: mpsc::Receiver<VoteSubmission>,
    snapshots: SnapshotPublisher,
    broadcaster: Broadcaster,
    stats: Arc<BallotStats>,
    report: ApplierReport,
}

impl VoteApplier {
    /// Assemble an applier from its exclusively-owned parts.
    pub fn new(
        tally: TallyStore,
        votes: mpsc::Receiver<VoteSubmission>,
        snapshots: SnapshotPublisher,
        broadcaster: Broadcaster,
        stats: Arc<BallotStats>,
    ) -> Self {
        Self {
            tally,
            votes,
            snapshots,
            broadcaster,
            stats,
            report: ApplierReport::default(),
        }
    }

    /// Apply one vote.
    ///
    /// # Errors
    ///
    /// [`BallotError::UnknownCandidate`] if the candidate does not exist.
    /// The tally is untouched and nothing is broadcast.
    pub fn apply(&mut self, vote: &VoteSubmission) -> Result<Candidate, BallotError> {
        let Some(updated) = self.tally.increment(&vote.candidate) else {
            self.stats.record_unknown();
            self.report.unknown = self.report.unknown.saturating_add(1);
            warn!(candidate = %vote.candidate, "Received vote for unknown candidate");
            return Err(BallotError::UnknownCandidate(vote.candidate.clone()));
        };

        self.stats.record_applied();
        self.report.applied = self.report.applied.saturating_add(1);
        self.snapshots.publish(&updated);

        if let Err(e) = self.broadcaster.publish(&updated) {
            warn!(candidate = %updated.name, error = %e, "Failed to serialize candidate update");
        }
        Ok(updated)
    }

    /// Drain the queue until it closes or `shutdown` fires, then apply
    /// whatever was accepted before the queue closed.
    pub async fn run(mut self, shutdown: CancellationToken) -> ApplierReport {
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                vote = self.votes.recv() => match vote {
                    Some(vote) => {
                        let _ = self.apply(&vote);
                    }
                    None => return self.report,
                },
            }
        }

        // Refuse new submissions, keep everything already accepted.
        self.votes.close();
        while let Some(vote) = self.votes.recv().await {
            let _ = self.apply(&vote);
            self.report.drained_at_shutdown = self.report.drained_at_shutdown.saturating_add(1);
        }

        info!(
            applied = self.report.applied,
            unknown = self.report.unknown,
            drained_at_shutdown = self.report.drained_at_shutdown,
            "Vote applier drained"
        );
        self.report
    }
}
