//! Single-writer snapshot cell for the current tallies.
//!
//! The applier is the only [`SnapshotPublisher`]; request handlers and
//! sessions read through cloned [`SnapshotReader`]s and never touch the
//! tally store itself.

use ballot_types::Candidate;
use tokio::sync::watch;

/// Write half, owned by the applier.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Vec<Candidate>>,
}

/// Read half, cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Vec<Candidate>>,
}

/// Create a snapshot cell seeded with `initial`, which must be ordered by
/// candidate name.
pub fn snapshot_cell(initial: Vec<Candidate>) -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(initial);
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

impl SnapshotPublisher {
    /// Replace the count of the candidate named in `updated`.
    pub fn publish(&self, updated: &Candidate) {
        self.tx.send_modify(|list| {
            if let Ok(index) = list.binary_search_by(|c| c.name.cmp(&updated.name)) {
                if let Some(slot) = list.get_mut(index) {
                    slot.votes = updated.votes;
                }
            }
        });
    }
}

impl SnapshotReader {
    /// All candidates ordered by name.
    pub fn current(&self) -> Vec<Candidate> {
        self.rx.borrow().clone()
    }

    /// Wait until the snapshot satisfies `predicate`. Returns `false` if the
    /// publisher is gone and the last value does not satisfy it.
    pub async fn wait_until<F>(&mut self, predicate: F) -> bool
    where
        F: FnMut(&Vec<Candidate>) -> bool,
    {
        self.rx.wait_for(predicate).await.is_ok()
    }
}
