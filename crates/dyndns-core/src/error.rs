//! Error types for the dynamic DNS updater
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the updater
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing or invalid parameters)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Echo service could not be reached in a structural way (timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client errors that are not tied to a provider response
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication or authorization rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Hosted zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (precondition violations, rejected change batches)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record set has a shape this updater does not manage
    #[error("Malformed record set: {0}")]
    MalformedRecord(String),

    /// Provider-side transient failure (5xx, dropped connection)
    #[error("Provider unavailable ({provider}): {message}")]
    Unavailable {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed_record(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Create a transient provider error
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed
    ///
    /// Throttling, timeouts and server-side failures are retryable.
    /// Authorization, validation and data-shape errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http(_) | Self::RateLimited(_) | Self::Unavailable { .. }
        )
    }
}
