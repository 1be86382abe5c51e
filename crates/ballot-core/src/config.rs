//! Configuration loading and typed config structures for the ballot.
//!
//! The canonical configuration lives in `ballot-config.yaml` at the project
//! root. Every field has a default, so an empty or missing file yields a
//! working two-candidate ballot on port 8080. Loaded configs are validated
//! before use.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but breaks a constraint.
    #[error("invalid config: {source}")]
    Invalid {
        /// Field-level validation failures.
        #[from]
        source: validator::ValidationErrors,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for environment variable {name}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level ballot configuration.
///
/// Mirrors the structure of `ballot-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct BallotConfig {
    /// Candidate set and submission policy.
    #[serde(default)]
    #[validate(nested)]
    pub ballot: CandidatesConfig,

    /// Vote queue sizing.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Subscriber buffers, keep-alives, and registry channel sizing.
    #[serde(default)]
    #[validate(nested)]
    pub subscribers: SubscribersConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BallotConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `BALLOT_HOST` overrides `server.host`
    /// - `BALLOT_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML,
    /// [`ConfigError::Env`] for a malformed override, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a default configuration with the given candidate names.
    pub fn with_candidates<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ballot: CandidatesConfig {
                candidates: names.into_iter().map(Into::into).collect(),
                ..CandidatesConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Candidate set and submission policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct CandidatesConfig {
    /// Candidate identifiers. Fixed for the lifetime of the process.
    #[serde(default = "default_candidates")]
    #[validate(length(min = 1), custom(function = "validate_candidate_names"))]
    pub candidates: Vec<String>,

    /// Reject unknown candidates at submission time instead of accepting
    /// and dropping them in the applier.
    #[serde(default)]
    pub validate_on_submit: bool,
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            validate_on_submit: false,
        }
    }
}

/// Vote queue sizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// Queue capacity. `0` means twice the available parallelism.
    #[serde(default)]
    pub capacity: usize,
}

impl QueueConfig {
    /// Capacity after resolving the `0` default.
    pub fn effective_capacity(&self) -> usize {
        resolve_capacity(self.capacity)
    }
}

/// Subscriber buffers, keep-alives, and registry channel sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
pub struct SubscribersConfig {
    /// Per-subscriber buffer capacity. `0` means twice the available
    /// parallelism.
    #[serde(default)]
    pub buffer_capacity: usize,

    /// Seconds between keep-alive frames on an idle stream.
    #[serde(default = "default_keep_alive_secs")]
    #[validate(range(min = 1))]
    pub keep_alive_secs: u64,

    /// Milliseconds a single frame write may take before the session is
    /// treated as disconnected. `0` disables the timeout.
    #[serde(default)]
    pub write_timeout_ms: u64,

    /// Capacity of the registry mutation channel.
    #[serde(default = "default_command_capacity")]
    #[validate(range(min = 1))]
    pub command_capacity: usize,

    /// Capacity of the lane carrying updates from the applier to the
    /// registry owner.
    #[serde(default = "default_update_lane_capacity")]
    #[validate(range(min = 1))]
    pub update_lane_capacity: usize,
}

impl SubscribersConfig {
    /// Per-subscriber buffer capacity after resolving the `0` default.
    pub fn effective_buffer_capacity(&self) -> usize {
        resolve_capacity(self.buffer_capacity)
    }

    /// Keep-alive interval.
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Write timeout, if enabled.
    pub const fn write_timeout(&self) -> Option<Duration> {
        if self.write_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.write_timeout_ms))
        }
    }
}

impl Default for SubscribersConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 0,
            keep_alive_secs: default_keep_alive_secs(),
            write_timeout_ms: 0,
            command_capacity: default_command_capacity(),
            update_lane_capacity: default_update_lane_capacity(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for open connections after shutdown starts.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl ServerSettings {
    /// Override listener settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `BALLOT_PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("BALLOT_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("BALLOT_PORT") {
            self.port = val.parse().map_err(|_parse_err| ConfigError::Env {
                name: "BALLOT_PORT",
                value: val.clone(),
            })?;
        }
        Ok(())
    }

    /// Shutdown grace period.
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults and validators
// ---------------------------------------------------------------------------

fn resolve_capacity(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .saturating_mul(2)
}

#[allow(clippy::ptr_arg)]
fn validate_candidate_names(names: &Vec<String>) -> Result<(), ValidationError> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(ValidationError::new("empty_candidate_name"));
    }
    let unique: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    if unique.len() != names.len() {
        return Err(ValidationError::new("duplicate_candidate_name"));
    }
    Ok(())
}

fn default_candidates() -> Vec<String> {
    vec![String::from("Candidate A"), String::from("Candidate B")]
}

const fn default_keep_alive_secs() -> u64 {
    60
}

const fn default_command_capacity() -> usize {
    64
}

const fn default_update_lane_capacity() -> usize {
    1024
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

const fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    String::from("info")
}
