//! Conversation checkpointing.
//!
//! Loads and saves are best-effort: a store failure is logged and the
//! request carries on. Only the checkpoint is lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::domain::models::{ConversationState, SaveOutcome, WorkflowResult};
use crate::domain::ports::ConversationRepository;

pub struct ConversationService {
    repository: Arc<dyn ConversationRepository>,
    history_limit: usize,
    ignored_writes: AtomicU64,
    failed_writes: AtomicU64,
}

impl ConversationService {
    pub fn new(repository: Arc<dyn ConversationRepository>, history_limit: usize) -> Self {
        Self {
            repository,
            history_limit,
            ignored_writes: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Prior state, or `None` when absent or unreadable.
    pub async fn load(&self, conversation_id: &str) -> Option<ConversationState> {
        match self.repository.load(conversation_id).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(conversation_id, error = %err, "failed to load conversation state");
                None
            }
        }
    }

    /// Save arbitrary state. Never fails the caller.
    pub async fn save(&self, conversation_id: &str, state: &Value) -> Option<SaveOutcome> {
        match self.repository.save(conversation_id, state).await {
            Ok(SaveOutcome::IgnoredNonObject) => {
                self.ignored_writes.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    conversation_id,
                    kind = json_kind(state),
                    "ignored non-object conversation state"
                );
                Some(SaveOutcome::IgnoredNonObject)
            }
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                tracing::error!(conversation_id, error = %err, "failed to save conversation state");
                None
            }
        }
    }

    /// Fold a finished turn into the prior state and persist it.
    pub async fn checkpoint(
        &self,
        prior: Option<&ConversationState>,
        result: &WorkflowResult,
    ) -> Option<SaveOutcome> {
        let state = self.next_state(prior, result);
        self.save(&result.conversation_id, &Value::Object(state)).await
    }

    /// Build the state written after a turn.
    pub fn next_state(
        &self,
        prior: Option<&ConversationState>,
        result: &WorkflowResult,
    ) -> Map<String, Value> {
        let mut state = prior.map(|p| p.state.clone()).unwrap_or_default();
        let turn_count = prior.map_or(0, ConversationState::turn_count) + 1;

        let mut history: Vec<Value> = state
            .get("history")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        history.push(json!({
            "user": result.query,
            "assistant": result.final_answer.clone().unwrap_or_default(),
            "intent": result.decision.intent,
        }));
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }

        state.insert("turn_count".to_string(), json!(turn_count));
        state.insert("last_intent".to_string(), json!(result.decision.intent));
        state.insert(
            "last_workflow".to_string(),
            json!(result.routing.selected_workflow_id),
        );
        state.insert("last_request_id".to_string(), json!(result.request_id));
        state.insert(
            "slots".to_string(),
            json!({
                "intent": result.decision.intent,
                "action": result.decision.action,
                "urgency": result.decision.urgency,
            }),
        );
        state.insert("history".to_string(), Value::Array(history));
        state.insert("partial_failure".to_string(), json!(result.partial_failure()));
        state
    }

    /// Saves dropped because the payload was not a JSON object.
    pub fn ignored_writes(&self) -> u64 {
        self.ignored_writes.load(Ordering::Relaxed)
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryRepository {
        rows: Mutex<HashMap<String, Map<String, Value>>>,
    }

    #[async_trait]
    impl ConversationRepository for MemoryRepository {
        async fn load(&self, conversation_id: &str) -> DomainResult<Option<ConversationState>> {
            Ok(self.rows.lock().await.get(conversation_id).map(|state| ConversationState {
                conversation_id: conversation_id.to_string(),
                state: state.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        }

        async fn save(&self, conversation_id: &str, state: &Value) -> DomainResult<SaveOutcome> {
            let Some(object) = state.as_object() else {
                return Ok(SaveOutcome::IgnoredNonObject);
            };
            self.rows
                .lock()
                .await
                .insert(conversation_id.to_string(), object.clone());
            Ok(SaveOutcome::Saved)
        }
    }

    struct BrokenRepository;

    #[async_trait]
    impl ConversationRepository for BrokenRepository {
        async fn load(&self, _conversation_id: &str) -> DomainResult<Option<ConversationState>> {
            Err(DomainError::DatabaseError("disk I/O error".to_string()))
        }

        async fn save(&self, _conversation_id: &str, _state: &Value) -> DomainResult<SaveOutcome> {
            Err(DomainError::DatabaseError("disk I/O error".to_string()))
        }
    }

    #[tokio::test]
    async fn test_non_object_save_is_counted() {
        let service = ConversationService::new(Arc::new(MemoryRepository::default()), 10);
        let outcome = service.save("c1", &json!(["not", "a", "map"])).await;
        assert_eq!(outcome, Some(SaveOutcome::IgnoredNonObject));
        assert_eq!(service.ignored_writes(), 1);
        assert!(service.load("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failures_are_not_fatal() {
        let service = ConversationService::new(Arc::new(BrokenRepository), 10);
        assert!(service.load("c1").await.is_none());
        assert!(service.save("c1", &json!({"a": 1})).await.is_none());
        assert_eq!(service.failed_writes(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_object() {
        let service = ConversationService::new(Arc::new(MemoryRepository::default()), 10);
        service.save("c1", &json!({"turn_count": 3})).await;
        let loaded = service.load("c1").await.unwrap();
        assert_eq!(loaded.turn_count(), 3);
    }
}
