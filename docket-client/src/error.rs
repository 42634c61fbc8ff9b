//! Error types for the Docket client

use docket_core::ContractViolation;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the pipeline service
///
/// The same taxonomy is used by the trackers, which decide from it whether a
/// failure is retried, surfaced, or turned into a login redirect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No token, or the service rejected it (HTTP 401)
    #[error("Authentication required: {0}")]
    Authentication(String),

    /// Required input was missing; no request was made
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The request never produced a response
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The response body could not be parsed
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The response parsed but broke the service contract
    #[error("Contract violation: {0}")]
    InvariantViolation(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether a later identical attempt might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Decode(_) => true,
            Self::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Remote { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Remote { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ContractViolation> for ClientError {
    fn from(err: ContractViolation) -> Self {
        Self::InvariantViolation(err.to_string())
    }
}
