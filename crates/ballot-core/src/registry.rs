//! # Subscriber registry - single-owner actor for the live handle set.
//!
//! The [`RegistryOwner`] task is the only code that ever touches the set of
//! registered [`SubscriberHandle`]s. Everyone else talks to it through a
//! cloned [`RegistryClient`]:
//!
//! ```text
//! sessions ──subscribe/unsubscribe──► [command channel] ──┐
//!                                                          ├─► RegistryOwner.run()
//! broadcaster ──────update────────►  [update lane] ───────┘      ├─► Add    → insert handle
//!                                                                 ├─► Remove → drop handle (closes it)
//!                                                                 ├─► Count  → reply
//!                                                                 └─► update → fan_out()
//! ```
//!
//! ## Rules
//! - Commands are applied one at a time, ahead of pending updates
//! - A removed handle is dropped immediately, so nothing is delivered to it again
//! - A handle whose subscription was dropped without `Remove` is evicted the
//!   first time a fan-out finds it closed
//! - An `Add` whose requester has already gone away is discarded, never left stale
//! - On shutdown: drain commands (removes applied, adds rejected), deliver
//!   queued updates, close every remaining handle once, exit

use std::collections::HashMap;
use std::sync::Arc;

use ballot_types::SubscriberId;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broadcast::fan_out;
use crate::error::BallotError;
use crate::handle::{subscriber_channel, SubscriberHandle, Subscription, UpdateMessage};
use crate::stats::BallotStats;

/// A request to the registry owner. Consumed exactly once.
#[derive(Debug)]
enum RegistryCommand {
    /// Insert a handle; acknowledged once it is live.
    Add {
        handle: SubscriberHandle,
        ack: oneshot::Sender<()>,
    },
    /// Remove and close a handle; replies whether it was registered.
    Remove {
        id: SubscriberId,
        ack: oneshot::Sender<bool>,
    },
    /// Report the number of registered handles.
    Count { reply: oneshot::Sender<usize> },
}

/// Cloneable front door to the registry owner.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    commands: mpsc::Sender<RegistryCommand>,
    buffer_capacity: usize,
}

/// What the owner did while shutting down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryReport {
    /// Handles still registered at shutdown, each closed exactly once.
    pub handles_closed: usize,
    /// `Add` requests refused because shutdown had begun.
    pub adds_rejected: usize,
    /// Updates still queued at shutdown that were fanned out before exit.
    pub updates_flushed: usize,
}

/// The task that exclusively owns the handle set.
#[derive(Debug)]
pub struct RegistryOwner {
    handles: HashMap<SubscriberId, SubscriberHandle>,
    commands: mpsc::Receiver<RegistryCommand>,
    updates: mpsc::Receiver<UpdateMessage>,
    stats: Arc<BallotStats>,
}

/// Create a registry client/owner pair.
///
/// * `command_capacity` -- bound on pending subscribe/unsubscribe requests
/// * `buffer_capacity` -- per-subscriber buffer size for new handles
/// * `updates` -- receiving end of the broadcaster's update lane
pub fn registry(
    command_capacity: usize,
    buffer_capacity: usize,
    updates: mpsc::Receiver<UpdateMessage>,
    stats: Arc<BallotStats>,
) -> (RegistryClient, RegistryOwner) {
    let (tx, rx) = mpsc::channel(command_capacity.max(1));
    let client = RegistryClient {
        commands: tx,
        buffer_capacity,
    };
    let owner = RegistryOwner {
        handles: HashMap::new(),
        commands: rx,
        updates,
        stats,
    };
    (client, owner)
}

impl RegistryClient {
    /// Create a handle, register it, and return the reading half once the
    /// owner has made it live.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] if the owner no longer accepts
    /// mutations. The handle is closed in that case.
    pub async fn subscribe(&self) -> Result<Subscription, BallotError> {
        let (handle, subscription) = subscriber_channel(self.buffer_capacity);
        let (ack, acked) = oneshot::channel();
        self.commands
            .send(RegistryCommand::Add { handle, ack })
            .await
            .map_err(|_closed| BallotError::ShutdownInProgress)?;
        acked
            .await
            .map_err(|_dropped| BallotError::ShutdownInProgress)?;
        Ok(subscription)
    }

    /// Remove and close the handle with `id`. Returns whether it was
    /// registered; removing twice is harmless.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] if the owner has exited, in which
    /// case every handle is already closed.
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<bool, BallotError> {
        let (ack, acked) = oneshot::channel();
        self.commands
            .send(RegistryCommand::Remove { id, ack })
            .await
            .map_err(|_closed| BallotError::ShutdownInProgress)?;
        acked
            .await
            .map_err(|_dropped| BallotError::ShutdownInProgress)
    }

    /// Number of registered handles.
    ///
    /// # Errors
    ///
    /// [`BallotError::ShutdownInProgress`] if the owner has exited.
    pub async fn count(&self) -> Result<usize, BallotError> {
        let (reply, replied) = oneshot::channel();
        self.commands
            .send(RegistryCommand::Count { reply })
            .await
            .map_err(|_closed| BallotError::ShutdownInProgress)?;
        replied
            .await
            .map_err(|_dropped| BallotError::ShutdownInProgress)
    }

    /// Per-subscriber buffer size used for new handles.
    pub const fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

impl RegistryOwner {
    /// Serve commands and updates until `shutdown` fires, then close every
    /// remaining handle and exit.
    pub async fn run(mut self, shutdown: CancellationToken) -> RegistryReport {
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(command) = self.commands.recv() => self.apply(command),
                Some(update) = self.updates.recv() => self.deliver(&update),
                else => break,
            }
        }
        self.shut_down()
    }

    fn apply(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Add { handle, ack } => {
                let id = handle.id();
                // Ack first: a requester that already gave up must not
                // leave a handle behind.
                if ack.send(()).is_ok() {
                    self.handles.insert(id, handle);
                    debug!(subscriber = %id, active = self.handles.len(), "Subscriber added");
                } else {
                    debug!(subscriber = %id, "Subscriber went away before registration");
                }
            }
            RegistryCommand::Remove { id, ack } => {
                let removed = self.handles.remove(&id).is_some();
                if removed {
                    debug!(subscriber = %id, active = self.handles.len(), "Subscriber removed");
                }
                let _ = ack.send(removed);
            }
            RegistryCommand::Count { reply } => {
                let _ = reply.send(self.handles.len());
            }
        }
    }

    fn deliver(&mut self, update: &UpdateMessage) {
        let outcome = fan_out(self.handles.values(), update);
        self.stats
            .record_deliveries(outcome.delivered, outcome.skipped());
        if outcome.skipped_closed > 0 {
            self.evict_abandoned();
        }
    }

    fn evict_abandoned(&mut self) {
        self.handles.retain(|id, handle| {
            let abandoned = handle.is_closed();
            if abandoned {
                debug!(subscriber = %id, "Evicting subscriber dropped without unsubscribe");
            }
            !abandoned
        });
    }

    fn shut_down(mut self) -> RegistryReport {
        let mut report = RegistryReport::default();
        self.commands.close();
        self.updates.close();

        while let Ok(command) = self.commands.try_recv() {
            match command {
                RegistryCommand::Add { handle, ack } => {
                    report.adds_rejected = report.adds_rejected.saturating_add(1);
                    drop(handle);
                    drop(ack);
                }
                other => self.apply(other),
            }
        }

        while let Ok(update) = self.updates.try_recv() {
            self.deliver(&update);
            report.updates_flushed = report.updates_flushed.saturating_add(1);
        }

        report.handles_closed = self.handles.len();
        self.handles.clear();

        info!(
            handles_closed = report.handles_closed,
            adds_rejected = report.adds_rejected,
            updates_flushed = report.updates_flushed,
            "Subscriber registry shut down"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::update_lane;

    struct Harness {
        client: RegistryClient,
        broadcaster: crate::broadcast::Broadcaster,
        shutdown: CancellationToken,
        task: tokio::task::JoinHandle<RegistryReport>,
    }

    fn start(buffer: usize) -> Harness {
        let stats = Arc::new(BallotStats::new());
        let (broadcaster, updates) = update_lane(16, Arc::clone(&stats));
        let (client, owner) = registry(8, buffer, updates, stats);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(owner.run(shutdown.clone()));
        Harness {
            client,
            broadcaster,
            shutdown,
            task,
        }
    }

    #[tokio::test]
    async fn add_then_remove_closes_the_handle() {
        let h = start(4);
        let mut sub = h.client.subscribe().await.ok();
        assert_eq!(h.client.count().await.ok(), Some(1));

        let id = sub.as_ref().map(Subscription::id);
        let removed = match id {
            Some(id) => h.client.unsubscribe(id).await.ok(),
            None => None,
        };
        assert_eq!(removed, Some(true));
        assert_eq!(h.client.count().await.ok(), Some(0));

        if let Some(sub) = sub.as_mut() {
            assert!(sub.recv().await.is_none());
        }
        h.shutdown.cancel();
        let _ = h.task.await;
    }

    #[tokio::test]
    async fn removing_twice_is_harmless() {
        let h = start(4);
        let sub = h.client.subscribe().await.ok();
        if let Some(sub) = sub {
            assert_eq!(h.client.unsubscribe(sub.id()).await.ok(), Some(true));
            assert_eq!(h.client.unsubscribe(sub.id()).await.ok(), Some(false));
        }
        h.shutdown.cancel();
        let _ = h.task.await;
    }

    #[tokio::test]
    async fn updates_reach_registered_handles_only() {
        let h = start(4);
        let mut early = h.client.subscribe().await.ok();

        let first = ballot_types::Candidate {
            name: String::from("A"),
            votes: 1,
        };
        assert!(h.broadcaster.publish(&first).is_ok());

        if let Some(sub) = early.as_mut() {
            assert_eq!(sub.recv().await.as_deref(), Some(r#"{"name":"A","votes":1}"#));
        }

        // A late joiner gets no replay of the first update.
        let mut late = h.client.subscribe().await.ok();
        let _ = h.client.count().await;
        if let Some(sub) = late.as_mut() {
            assert!(sub.try_recv().is_none());
        }

        h.shutdown.cancel();
        let _ = h.task.await;
    }

    #[tokio::test]
    async fn dropped_subscription_is_evicted_on_next_update() {
        let h = start(4);
        let mut live = h.client.subscribe().await.ok();
        let abandoned = h.client.subscribe().await.ok();
        assert_eq!(h.client.count().await.ok(), Some(2));
        drop(abandoned);

        let update = ballot_types::Candidate {
            name: String::from("A"),
            votes: 1,
        };
        assert!(h.broadcaster.publish(&update).is_ok());

        // Once the live handle has the update, that fan-out (and the
        // eviction it triggers) is done.
        if let Some(sub) = live.as_mut() {
            assert!(sub.recv().await.is_some());
        }
        assert_eq!(h.client.count().await.ok(), Some(1));

        h.shutdown.cancel();
        let report = h.task.await.ok();
        assert_eq!(report.map(|r| r.handles_closed), Some(1));
    }

    #[tokio::test]
    async fn shutdown_closes_remaining_handles_and_refuses_more() {
        let h = start(4);
        let mut a = h.client.subscribe().await.ok();
        let mut b = h.client.subscribe().await.ok();

        h.shutdown.cancel();
        let report = h.task.await.ok();
        assert_eq!(report.map(|r| r.handles_closed), Some(2));

        for sub in [a.as_mut(), b.as_mut()].into_iter().flatten() {
            assert!(sub.recv().await.is_none());
        }
        assert!(matches!(
            h.client.subscribe().await,
            Err(BallotError::ShutdownInProgress)
        ));
        assert!(matches!(
            h.client.count().await,
            Err(BallotError::ShutdownInProgress)
        ));
    }

    #[tokio::test]
    async fn queued_updates_are_flushed_before_handles_close() {
        let h = start(4);
        let mut sub = h.client.subscribe().await.ok();

        // Cancel first so the owner's next wake-up is the shutdown branch.
        h.shutdown.cancel();
        let update = ballot_types::Candidate {
            name: String::from("B"),
            votes: 7,
        };
        let _ = h.broadcaster.publish(&update);
        let _ = h.task.await;

        if let Some(sub) = sub.as_mut() {
            let mut last = None;
            while let Some(message) = sub.recv().await {
                last = Some(message);
            }
            assert_eq!(last.as_deref(), Some(r#"{"name":"B","votes":7}"#));
        }
    }
}
