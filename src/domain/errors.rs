//! Domain errors for the provost orchestration core.

use thiserror::Error;

/// Domain-level errors raised below the orchestration boundary.
///
/// None of these reach an HTTP caller directly: the orchestrator folds them
/// into `AgentResult` statuses, empty retrieval context, or lost checkpoints,
/// and only surfaces an [`crate::services::orchestrator::OrchestrationError`].
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Agent {agent_id} failed: {reason}")]
    AgentFailed { agent_id: String, reason: String },

    #[error("Agent {agent_id} timed out after {timeout_ms}ms")]
    AgentTimeout { agent_id: String, timeout_ms: u64 },

    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("LLM provider error: {0}")]
    LlmError(String),

    #[error("Data service error: {0}")]
    DataServiceError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Envelope validation failed: {0}")]
    EnvelopeValidation(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether a retry of the same call could plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AgentTimeout { .. }
                | Self::AgentFailed { .. }
                | Self::DataServiceError(_)
                | Self::LlmError(_)
                | Self::RetrievalFailed(_)
        )
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
