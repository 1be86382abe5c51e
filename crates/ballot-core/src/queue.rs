//! Bounded intake buffer for vote submissions.
//!
//! Many producers hold a cloned [`VoteQueue`]; exactly one
//! [`VoteApplier`](crate::applier::VoteApplier) owns the receiving end.
//! Enqueueing never waits: a full buffer is reported as
//! [`BallotError::Busy`] and a closed one as
//! [`BallotError::ShutdownInProgress`].

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::BallotError;
use crate::stats::BallotStats;

/// A vote waiting to be applied. Consumed exactly once by the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSubmission {
    /// The candidate the vote is for.
    pub candidate: String,
}

/// Producer half of the vote queue.
#[derive(Debug, Clone)]
pub struct VoteQueue {
    tx: mpsc::Sender<VoteSubmission>,
    stats: Arc<BallotStats>,
}

/// Create a vote queue with room for `capacity` pending submissions.
///
/// A `capacity` of zero is raised to one.
pub fn vote_queue(
    capacity: usize,
    stats: Arc<BallotStats>,
) -> (VoteQueue, mpsc::Receiver<VoteSubmission>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (VoteQueue { tx, stats }, rx)
}

impl VoteQueue {
    /// Offer a vote without waiting.
    ///
    /// `Ok(())` means the vote was accepted for processing, not that it has
    /// been applied yet.
    ///
    /// # Errors
    ///
    /// [`BallotError::Busy`] when the buffer is full,
    /// [`BallotError::ShutdownInProgress`] once the applier has closed it.
    pub fn enqueue(&self, candidate: impl Into<String>) -> Result<(), BallotError> {
        let submission = VoteSubmission {
            candidate: candidate.into(),
        };
        match self.tx.try_send(submission) {
            Ok(()) => {
                self.stats.record_accepted();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_busy();
                Err(BallotError::Busy)
            }
            Err(TrySendError::Closed(_)) => Err(BallotError::ShutdownInProgress),
        }
    }

    /// Maximum number of pending submissions.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the applier has stopped accepting submissions.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
