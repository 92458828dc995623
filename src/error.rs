//! Error types for actions-top
//!
//! Two families of errors exist and they never mix:
//! - [`Error`] is fatal. It aborts a poll cycle before any output is produced
//!   (bad configuration, missing token, failure to enumerate repositories).
//! - [`FetchError`] belongs to a single fetch job. It is absorbed into a
//!   [`JobOutcome::Warning`](crate::types::JobOutcome) and never crosses the
//!   aggregation step.

use thiserror::Error;

/// Result type alias for actions-top operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main (fatal) error type for actions-top
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.max_concurrent_requests")
        key: Option<String>,
    },

    /// No access token was supplied
    #[error("access token must be provided via --token or the GITHUB_TOKEN environment variable")]
    MissingCredential,

    /// Listing the repositories of an organization failed
    #[error("failed to list repositories of '{namespace}': HTTP {status}: {body}")]
    Enumeration {
        /// Organization whose repositories were being listed
        namespace: String,
        /// HTTP status returned by the API
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL could not be built
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error (writing presenter output)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure of one page request belonging to a fetch job
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-success status
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code returned by the API
        status: u16,
    },

    /// The request never produced a response (timeout, connection refused, ...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected JSON shape
    #[error("malformed response body: {0}")]
    Decode(String),

    /// The task running the job panicked or was aborted
    #[error("job task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    /// Upstream HTTP status, when the failure carried one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Decode(_) | FetchError::TaskFailed(_) => None,
        }
    }
}
