//! Error types for the alerting client.
//!
//! Two families live here. [`ClientError`] is returned synchronously when the
//! host misuses the API (an integration bug). [`TransportError`] describes a
//! failed transmission attempt and never reaches the host directly; the
//! delivery pipeline turns it into a retry or a dropped item.

use reqwest::StatusCode;
use thiserror::Error;

/// Caller misuse of the public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A severity name that is not one of debug, info, warning, error, critical
    #[error("invalid severity '{0}': expected one of debug, info, warning, error, critical")]
    InvalidSeverity(String),

    /// A required field of a direct alert was missing or blank
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// `set_context` was called with an empty bucket name
    #[error("context name must not be empty")]
    EmptyContextName,
}

/// Errors from a single transmission attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Failed to serialize the batch
    #[error("failed to serialize batch: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The collector answered with a non-success status
    #[error("collector returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },
}

impl TransportError {
    /// Check if the failed attempt is worth retrying.
    ///
    /// Returns `true` for network errors, timeouts, server errors (5xx) and
    /// rate limiting (429). Any other status is terminal: retrying a request
    /// the collector refused cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            Self::BuildHttpClient(_) | Self::Serialize(_) => false,
        }
    }

    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err)
        }
    }
}
