//! Error Types
//!
//! Errors raised at the two fallible boundaries of the designer: the quota
//! state file and the generative text service. Neither ever reaches the
//! end user with detail; callers log them and degrade.

use std::io;
use std::path::PathBuf;

/// Failure reading or writing the persisted quota state
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// State file could not be read
    #[error("Failed to read quota state from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// State file could not be written or moved into place
    #[error("Failed to write quota state to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// State file contents are not a valid quota record
    #[error("Failed to parse quota state from {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// State could not be serialized
    #[error("Failed to serialize quota state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backing medium refused the write (used by in-memory stores)
    #[error("Quota storage is read-only")]
    ReadOnly,
}

/// Failure from the generative text service
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// No API key configured
    #[error("No API key configured for the generator")]
    MissingApiKey,

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// Network or timeout failure
    #[error("Generator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Generator API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Prompt was rejected by the service's safety filters
    #[error("Prompt blocked by generator: {0}")]
    Blocked(String),

    /// Service answered without any text
    #[error("Generator returned an empty response")]
    EmptyResponse,

    /// Response body did not match the expected shape
    #[error("Invalid generator response: {0}")]
    InvalidResponse(String),
}

impl GeneratorError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missing_api_key",
            Self::Client(_) => "client",
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::Blocked(_) => "blocked",
            Self::EmptyResponse => "empty_response",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}
