//! Shared application state for the HTTP layer.

use ballot_core::Ballot;

/// State handed to every handler.
///
/// The [`Ballot`] is itself a cheap handle; the router wraps this struct
/// in an `Arc` so handlers share one copy.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The running ballot.
    pub ballot: Ballot,
}

impl AppState {
    /// Wrap a running ballot.
    pub const fn new(ballot: Ballot) -> Self {
        Self { ballot }
    }
}
