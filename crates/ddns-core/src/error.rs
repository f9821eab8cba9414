//! Error types for the DDNS system
//!
//! The variants follow the failure taxonomy the orchestrator acts on:
//! resolution failures degrade a cycle, authentication and configuration
//! failures are non-retryable, transient failures are retried by the next
//! scheduled cycle.

use thiserror::Error;

use crate::config::RecordType;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// No lookup source produced a valid address this cycle
    #[error("Address resolution failed: {0}")]
    ResolutionFailed(String),

    /// Missing, invalid or insufficient credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or API failure expected to clear on a later cycle
    #[error("Transient error: {0}")]
    Transient(String),

    /// A backend cannot manage records of this type
    #[error("Provider {provider} does not support {record_type} records")]
    UnsupportedRecordType {
        /// Provider name
        provider: String,
        /// Rejected record type
        record_type: RecordType,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider rejected the request for a reason that is not classified
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Socket-level errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution failure
    pub fn resolution_failed(msg: impl Into<String>) -> Self {
        Self::ResolutionFailed(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported record type error
    pub fn unsupported_record_type(provider: impl Into<String>, record_type: RecordType) -> Self {
        Self::UnsupportedRecordType {
            provider: provider.into(),
            record_type,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status returned by a provider API
    ///
    /// - 401/403 → [`Error::Authentication`]
    /// - 408/429/5xx → [`Error::Transient`]
    /// - anything else → [`Error::Provider`]
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!(
                "{provider}: invalid credentials or insufficient permissions (status {status})"
            )),
            408 | 429 => Self::transient(format!(
                "{provider}: request throttled or timed out (status {status})"
            )),
            500..=599 => Self::transient(format!(
                "{provider}: server error (status {status}): {body}"
            )),
            _ => Self::provider(provider, format!("status {status}: {body}")),
        }
    }

    /// Whether a later cycle may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient(_) | Self::Network(_) | Self::ResolutionFailed(_)
        )
    }
}
