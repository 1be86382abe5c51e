//! Per-subscriber output channels.
//!
//! A [`subscriber_channel`] call yields two halves. The
//! [`SubscriberHandle`] is moved into the registry, which is then its only
//! owner; dropping it is how the handle gets closed. The [`Subscription`]
//! stays with the session and yields update messages until the handle is
//! closed.

use std::sync::Arc;

use ballot_types::SubscriberId;
use tokio::sync::mpsc::{self, error::TrySendError};

/// A serialized candidate record, shared by every subscriber it is sent to.
pub type UpdateMessage = Arc<str>;

/// Registry-side half of a subscriber channel. Not `Clone`: the registry
/// holds the only sender, so removing it closes the channel exactly once.
#[derive(Debug)]
pub struct SubscriberHandle {
    id: SubscriberId,
    tx: mpsc::Sender<UpdateMessage>,
}

/// Session-side half of a subscriber channel.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<UpdateMessage>,
}

/// Create a bounded subscriber channel holding up to `capacity` messages.
///
/// A `capacity` of zero is raised to one.
pub fn subscriber_channel(capacity: usize) -> (SubscriberHandle, Subscription) {
    let id = SubscriberId::new();
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SubscriberHandle { id, tx }, Subscription { id, rx })
}

impl SubscriberHandle {
    /// Identity of this handle.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the session side has dropped its [`Subscription`].
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Attempt delivery without waiting.
    pub(crate) fn try_deliver(
        &self,
        message: &UpdateMessage,
    ) -> Result<(), TrySendError<UpdateMessage>> {
        self.tx.try_send(Arc::clone(message))
    }
}

impl Subscription {
    /// Identity of the handle this subscription reads from.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next update. `None` once the handle has been closed and
    /// every buffered message has been read.
    pub async fn recv(&mut self) -> Option<UpdateMessage> {
        self.rx.recv().await
    }

    /// Take a buffered update without waiting.
    pub fn try_recv(&mut self) -> Option<UpdateMessage> {
        self.rx.try_recv().ok()
    }

    /// Whether the registry has closed the handle. Buffered messages may
    /// still be readable.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}
