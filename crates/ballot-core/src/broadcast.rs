//! Fan-out of tally changes to subscribers.
//!
//! The [`Broadcaster`] sits on the applier side: it serializes each
//! updated record once and hands it to the registry owner over a bounded
//! lane without waiting. The owner then calls [`fan_out`] against the
//! handle set it exclusively holds.
//!
//! ```text
//! applier ──publish()──► [update lane] ──► registry owner ──fan_out()──┬─► handle 1
//!          (try_send)      (bounded)                                   ├─► handle 2
//!                                                                      └─► handle N
//!                                                                       (try_send each)
//! ```
//!
//! Neither hop ever blocks. A full subscriber buffer skips that subscriber
//! for this update only; a full lane drops the update for everyone.

use std::sync::Arc;

use ballot_types::Candidate;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::BallotError;
use crate::handle::{SubscriberHandle, UpdateMessage};
use crate::stats::BallotStats;

/// Applier-side entry point for broadcasting updates.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    lane: mpsc::Sender<UpdateMessage>,
    stats: Arc<BallotStats>,
}

/// Create the lane between the broadcaster and the registry owner.
pub fn update_lane(
    capacity: usize,
    stats: Arc<BallotStats>,
) -> (Broadcaster, mpsc::Receiver<UpdateMessage>) {
    let (lane, rx) = mpsc::channel(capacity.max(1));
    (Broadcaster { lane, stats }, rx)
}

impl Broadcaster {
    /// Serialize `candidate` and queue it for fan-out without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`BallotError::Serialization`] if the record cannot be
    /// encoded. A saturated or closed lane is not an error for the caller;
    /// the update is dropped and counted.
    pub fn publish(&self, candidate: &Candidate) -> Result<(), BallotError> {
        let message: UpdateMessage = Arc::from(serde_json::to_string(candidate)?);
        match self.lane.try_send(message) {
            Ok(()) => self.stats.record_published(),
            Err(TrySendError::Full(_)) => {
                self.stats.record_update_dropped();
                warn!(candidate = %candidate.name, votes = candidate.votes, "Fan-out lane full, dropping update");
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.record_update_dropped();
                debug!(candidate = %candidate.name, "Registry gone, dropping update");
            }
        }
        Ok(())
    }
}

/// Result of delivering one update to a handle set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Handles that accepted the message.
    pub delivered: u64,
    /// Handles skipped because their buffer was full.
    pub skipped_full: u64,
    /// Handles skipped because their session already dropped the receiver.
    pub skipped_closed: u64,
}

impl FanOut {
    /// Total handles skipped for any reason.
    pub const fn skipped(&self) -> u64 {
        self.skipped_full.saturating_add(self.skipped_closed)
    }
}

/// Offer `message` to every handle without waiting on any of them.
pub fn fan_out<'a, I>(handles: I, message: &UpdateMessage) -> FanOut
where
    I: IntoIterator<Item = &'a SubscriberHandle>,
{
    let mut outcome = FanOut::default();
    for handle in handles {
        match handle.try_deliver(message) {
            Ok(()) => outcome.delivered = outcome.delivered.saturating_add(1),
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %handle.id(), "Skipping slow subscriber");
                outcome.skipped_full = outcome.skipped_full.saturating_add(1);
            }
            Err(TrySendError::Closed(_)) => {
                outcome.skipped_closed = outcome.skipped_closed.saturating_add(1);
            }
        }
    }
    outcome
}
