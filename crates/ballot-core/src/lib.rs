//! Vote serialization, subscriber registry, and broadcast fan-out for the
//! live ballot service.
//!
//! Votes are accepted without waiting, applied by a single task, and each
//! resulting tally change is pushed to every live observer. Slow observers
//! miss updates; they never slow voting down.
//!
//! # Modules
//!
//! - [`applier`] -- The sequential worker that owns the tally.
//! - [`ballot`] -- [`Ballot`] facade: startup wiring and ordered shutdown.
//! - [`broadcast`] -- Serialize-once, drop-on-full fan-out.
//! - [`config`] -- Configuration loading from `ballot-config.yaml`.
//! - [`error`] -- [`BallotError`].
//! - [`handle`] -- Bounded per-subscriber channels.
//! - [`queue`] -- Bounded vote queue with non-blocking submission.
//! - [`registry`] -- Single-owner actor for the subscriber set.
//! - [`session`] -- Per-observer session loop with keep-alives.
//! - [`snapshot`] -- Lock-free readable view of the current tallies.
//! - [`stats`] -- Atomic counters for the status endpoint.
//! - [`tally`] -- Candidate counts.

pub mod applier;
pub mod ballot;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod handle;
pub mod queue;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod tally;

pub use ballot::{Ballot, ShutdownReport};
pub use config::{BallotConfig, ConfigError};
pub use error::BallotError;
pub use handle::{Subscription, UpdateMessage};
pub use session::{ChannelTransport, Frame, SessionExit, SessionSettings, SessionTransport};
