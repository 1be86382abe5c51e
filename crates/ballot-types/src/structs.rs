//! Wire structs shared by the ballot core, the HTTP layer, and the
//! dashboard.
//!
//! The JSON shape of [`Candidate`] is a public contract: update messages
//! on the event stream and the `/results` body both use it verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A candidate and its current tally.
///
/// Serialized as `{"name": "...", "votes": N}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Candidate {
    /// Unique, immutable candidate identifier.
    pub name: String,
    /// Number of votes applied so far. Never decreases.
    #[ts(type = "number")]
    pub votes: u64,
}

impl Candidate {
    /// Create a candidate with zero votes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            votes: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Counters describing ballot activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BallotCounters {
    /// Votes accepted into the queue.
    #[ts(type = "number")]
    pub votes_accepted: u64,
    /// Submissions rejected because the queue was full.
    #[ts(type = "number")]
    pub votes_busy: u64,
    /// Votes applied to the tally.
    #[ts(type = "number")]
    pub votes_applied: u64,
    /// Accepted votes dropped because the candidate does not exist.
    #[ts(type = "number")]
    pub votes_unknown: u64,
    /// Update messages handed to the registry for fan-out.
    #[ts(type = "number")]
    pub updates_published: u64,
    /// Update messages dropped because the fan-out lane was saturated.
    #[ts(type = "number")]
    pub updates_dropped: u64,
    /// Individual subscriber deliveries that succeeded.
    #[ts(type = "number")]
    pub deliveries: u64,
    /// Individual subscriber deliveries skipped (buffer full or receiver gone).
    #[ts(type = "number")]
    pub deliveries_skipped: u64,
}

/// JSON-serializable status of the ballot for `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BallotStatus {
    /// Current tallies ordered by candidate name.
    pub candidates: Vec<Candidate>,
    /// Number of subscriber handles currently registered.
    #[ts(type = "number")]
    pub subscribers: u64,
    /// Activity counters.
    pub counters: BallotCounters,
    /// Whether shutdown has begun.
    pub shutting_down: bool,
    /// When the ballot was started.
    #[ts(type = "string")]
    pub started_at: DateTime<Utc>,
    /// Elapsed wall-clock seconds since start.
    #[ts(type = "number")]
    pub uptime_seconds: u64,
}
