//! Error taxonomy for the ballot core.
//!
//! Every failure is local to the component that detects it. The applier
//! and the registry owner never stop because of one bad submission or one
//! broken subscriber; these variants describe what a caller sees instead.

/// Errors surfaced by the ballot core to its callers.
#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    /// The vote queue is saturated. Transient; retry later.
    #[error("server is busy, try again later")]
    Busy,

    /// The submission names a candidate that does not exist.
    #[error("unknown candidate: {0}")]
    UnknownCandidate(String),

    /// A subscriber's transport could not accept a frame.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Shutdown has begun; new votes and registry mutations are refused.
    #[error("shutdown in progress")]
    ShutdownInProgress,

    /// A candidate record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BallotError {
    /// Whether the caller may reasonably retry the same request later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
