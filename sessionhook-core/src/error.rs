//! Error types for sessionhook-core

use thiserror::Error;

/// Why a single webhook delivery attempt failed
///
/// Cloneable so it can travel on the delivery event broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The endpoint answered with something other than 200 or 204
    #[error("invalid response status: {0}")]
    InvalidStatus(u16),

    /// The POST could not complete (DNS, refused, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Non-fatal anomalies raised while ingesting fragments
///
/// These never reach the producer; ingestion logs them and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestAnomaly {
    #[error("session {session_id} is marked as completed but received {bytes} more bytes")]
    LateDataAfterCompletion { session_id: String, bytes: usize },
}

/// Errors loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("webhook url is not configured")]
    MissingUrl,

    #[error("invalid webhook url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retention.sweep_interval must be greater than zero")]
    ZeroSweepInterval,

    #[error("webhook.timeout must be greater than zero")]
    ZeroTimeout,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
