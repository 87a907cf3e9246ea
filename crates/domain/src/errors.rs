//! Error types used throughout the client

use std::time::Duration;

use thiserror::Error;

use crate::types::ProtocolError;

/// Failure of a single physical HTTP call.
///
/// The transport never looks inside the payload; everything here happened
/// before a response envelope could be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Non-200 status. Displayed as `"<code> <text>"`, the same shape the
    /// platform's HTTP stack reports (e.g. `"500 Internal Server Error"`).
    #[error("{code} {status_text}")]
    Status { code: u16, status_text: String },

    #[error("failed to read response body: {0}")]
    Read(String),

    #[error("failed to encode request: {0}")]
    Serialization(String),

    #[error("network error: {0}")]
    Network(String),

    /// The per-call deadline fired and cancelled the request.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("client is shutting down")]
    Shutdown,
}

/// Broad error classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing credential or invalid configuration - never retried
    Configuration,
    /// Network/HTTP failure - retried for idempotent calls only
    Transport,
    /// Remote rate limiting - retried with increasing backoff
    FloodControl,
    /// Any other non-zero remote error code - never retried
    Protocol,
    /// Malformed envelope, undecodable payload, or invalid batch plan
    Malformed,
    /// Caller-requested cancellation
    Cancelled,
    /// Process-wide shutdown
    Shutdown,
}

/// Main error type for logical calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("no access token")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(TransportError),

    #[error("{message}")]
    Flood { code: i64, message: String },

    #[error("{0}")]
    Protocol(ProtocolError),

    #[error("Malformed response envelope: {0}")]
    Parse(String),

    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Invalid batch plan: {0}")]
    Script(String),

    #[error("context canceled")]
    Cancelled,

    #[error("client is shutting down")]
    Shutdown,
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential | Self::Config(_) => ErrorCategory::Configuration,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Flood { .. } => ErrorCategory::FloodControl,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Parse(_) | Self::Decode(_) | Self::Script(_) => ErrorCategory::Malformed,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Shutdown => ErrorCategory::Shutdown,
        }
    }

    /// Whether errors of this category are ever re-issued by the retry
    /// governor. A `true` here does not mean this particular value was
    /// retryable; it already surfaced.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transport | ErrorCategory::FloodControl)
    }

    /// Remote error code, when the platform supplied one.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Self::Flood { code, .. } => Some(*code),
            Self::Protocol(err) => Some(err.error_code),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Shutdown => Self::Shutdown,
            TransportError::Cancelled => Self::Cancelled,
            other => Self::Transport(other),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;
