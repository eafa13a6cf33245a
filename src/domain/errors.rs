//! Domain errors for the agent runtime and knowledge store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain-level errors that can occur in the agent runtime.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Agent configuration not found: {0}")]
    ConfigNotFound(String),

    #[error("Agent is not active: {0}")]
    AgentInactive(String),

    #[error("Model initialization failed: {0}")]
    ModelInitFailed(String),

    #[error("Failed to bind tool '{tool}': {reason}")]
    ToolBindFailed { tool: String, reason: String },

    #[error("Invalid document {document_id}: {reason}")]
    InvalidDocument { document_id: String, reason: String },

    #[error("Retrieval backend unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocationFailed(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Serializable tag for a [`DomainError`], carried by query results so the
/// API layer can map failures without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigNotFound,
    AgentInactive,
    ModelInitFailed,
    ToolBindFailed,
    InvalidDocument,
    RetrievalUnavailable,
    ModelInvocationFailed,
    ToolExecutionFailed,
    Timeout,
    ValidationFailed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "ConfigNotFound",
            Self::AgentInactive => "AgentInactive",
            Self::ModelInitFailed => "ModelInitFailed",
            Self::ToolBindFailed => "ToolBindFailed",
            Self::InvalidDocument => "InvalidDocument",
            Self::RetrievalUnavailable => "RetrievalUnavailable",
            Self::ModelInvocationFailed => "ModelInvocationFailed",
            Self::ToolExecutionFailed => "ToolExecutionFailed",
            Self::Timeout => "Timeout",
            Self::ValidationFailed => "ValidationFailed",
            Self::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainError {
    /// The structured kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound(_) => ErrorKind::ConfigNotFound,
            Self::AgentInactive(_) => ErrorKind::AgentInactive,
            Self::ModelInitFailed(_) => ErrorKind::ModelInitFailed,
            Self::ToolBindFailed { .. } => ErrorKind::ToolBindFailed,
            Self::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Self::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            Self::ModelInvocationFailed(_) => ErrorKind::ModelInvocationFailed,
            Self::ToolExecutionFailed { .. } => ErrorKind::ToolExecutionFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::DatabaseError(_) | Self::SerializationError(_) => ErrorKind::Internal,
        }
    }

    /// Errors the API layer reports as client errors (4xx) rather than
    /// collapsing into a generic failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ConfigNotFound(_) | Self::AgentInactive(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
