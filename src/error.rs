//! Error types for metaforge client operations

use thiserror::Error;

use crate::models::ErrorEnvelope;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Backend could not be reached or reported itself unhealthy
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Error reported by the backend, kept verbatim
    #[error("Backend error [{}]: {}", .0.code, .0.message)]
    Backend(ErrorEnvelope),

    /// Plan is missing required fields or is inconsistent
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Conversation workflow used out of order
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// True when the failure came from the caller's context rather than the backend
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Cancelled | ClientError::DeadlineExceeded)
    }

    /// Short stable label for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unavailable(_) => "unavailable",
            ClientError::Cancelled => "cancelled",
            ClientError::DeadlineExceeded => "deadline_exceeded",
            ClientError::Backend(_) => "backend",
            ClientError::InvalidPlan(_) => "invalid_plan",
            ClientError::Conversation(_) => "conversation",
            ClientError::Io(_) => "io",
            ClientError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<ErrorEnvelope> for ClientError {
    fn from(envelope: ErrorEnvelope) -> Self {
        ClientError::Backend(envelope)
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
