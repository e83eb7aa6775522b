//! Persisted conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of resumable session state, keyed by conversation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    pub state: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.state.get(key)
    }

    pub fn turn_count(&self) -> u64 {
        self.state
            .get("turn_count")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

/// Result of a save call. Non-object payloads are dropped, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    IgnoredNonObject,
}
