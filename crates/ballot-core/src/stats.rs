//! Observability counters for the ballot.
//!
//! Each counter is an independent atomic incremented by exactly one kind of
//! event. Nothing reads them to make decisions, so relaxed ordering is
//! enough.

use std::sync::atomic::{AtomicU64, Ordering};

use ballot_types::BallotCounters;

/// Shared counters, wrapped in an `Arc` by the [`Ballot`](crate::Ballot).
#[derive(Debug, Default)]
pub struct BallotStats {
    votes_accepted: AtomicU64,
    votes_busy: AtomicU64,
    votes_applied: AtomicU64,
    votes_unknown: AtomicU64,
    updates_published: AtomicU64,
    updates_dropped: AtomicU64,
    deliveries: AtomicU64,
    deliveries_skipped: AtomicU64,
}

impl BallotStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.votes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_busy(&self) {
        self.votes_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_applied(&self) {
        self.votes_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown(&self) {
        self.votes_unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.updates_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update_dropped(&self) {
        self.updates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deliveries(&self, delivered: u64, skipped: u64) {
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
        self.deliveries_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter.
    pub fn snapshot(&self) -> BallotCounters {
        BallotCounters {
            votes_accepted: self.votes_accepted.load(Ordering::Relaxed),
            votes_busy: self.votes_busy.load(Ordering::Relaxed),
            votes_applied: self.votes_applied.load(Ordering::Relaxed),
            votes_unknown: self.votes_unknown.load(Ordering::Relaxed),
            updates_published: self.updates_published.load(Ordering::Relaxed),
            updates_dropped: self.updates_dropped.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
        }
    }
}
