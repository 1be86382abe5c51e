//! Error types for the ballot server binary.

/// Startup failures that `main` reports before exiting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ballot_core::ConfigError,
    },

    /// The HTTP server failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying startup error.
        #[from]
        source: ballot_observer::StartupError,
    },

    /// A logging filter could not be parsed.
    #[error("invalid log filter {filter:?}: {message}")]
    LogFilter {
        /// The filter string that failed.
        filter: String,
        /// Parser message.
        message: String,
    },
}
