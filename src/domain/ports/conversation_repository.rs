//! Conversation state repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ConversationState, SaveOutcome};

/// Persistence for resumable session state, one row per conversation.
///
/// Implementations must upsert: concurrent saves for different
/// conversations never block each other, and the store keeps at most one
/// row per `conversation_id`.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns `None` when the conversation has never been saved.
    async fn load(&self, conversation_id: &str) -> DomainResult<Option<ConversationState>>;

    /// Insert or update the state. Non-object values are ignored, not rejected.
    async fn save(
        &self,
        conversation_id: &str,
        state: &serde_json::Value,
    ) -> DomainResult<SaveOutcome>;
}
