//! Error types for the triage bot.

use thiserror::Error;

/// Errors returned by an [`IssueTracker`](crate::tracker::IssueTracker).
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The requested resource does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered with a non-success status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TrackerError {
    /// Whether this error is a not-found condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid repository '{0}' (expected owner/repo)")]
    InvalidRepository(String),

    #[error("Invalid pattern for {name}: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while reading the trigger context.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Failed to read event payload {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}
