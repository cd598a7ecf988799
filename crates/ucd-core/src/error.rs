//! Error types for UrbanCode Deploy operations.
//!
//! This module provides the single error type shared by the core invocation
//! layer and every resource client, including HTTP status classification and
//! conversions from the underlying HTTP, URL and JSON libraries.

use thiserror::Error;

/// Main error type for UrbanCode Deploy operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server answered with a status of 300 or greater.
    #[error("{status} {reason}\n{}", .body.as_deref().unwrap_or_default())]
    Request {
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status
        reason: String,
        /// Raw response body, absent for "no content" responses
        body: Option<String>,
    },

    /// A polling deadline elapsed before the awaited state was observed
    #[error("Timeout waiting for {0}")]
    PollTimeout(String),

    /// A required argument was missing or empty
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request could not be sent or the response could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A lookup over a successful response found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid identifier
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

/// Specialized result type for UrbanCode Deploy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::Request`] from the parts of a completed exchange.
    #[must_use]
    pub fn request(status: u16, reason: impl Into<String>, body: Option<String>) -> Self {
        Self::Request {
            status,
            reason: reason.into(),
            body,
        }
    }

    /// Shorthand for a missing required argument.
    #[must_use]
    pub fn missing_argument(name: &str) -> Self {
        Self::Validation(format!("{name} was not supplied"))
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request { .. } => "REQUEST_FAILED",
            Self::PollTimeout(_) => "POLL_TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidId(_) => "INVALID_ID",
        }
    }

    /// HTTP status carried by a [`Error::Request`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for I/O failures that a poller may treat as "not yet available".
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Config(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidId(err.to_string())
    }
}
