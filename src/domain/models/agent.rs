//! Agent request/result models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::retrieval::RetrievedChunk;
use super::rule::{RuleAction, Urgency};

/// Outcome status of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Ok,
    Error,
    Partial,
}

impl AgentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Partial => "partial",
        }
    }

    /// Ok and partial results both carry a usable answer.
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Ok | Self::Partial)
    }
}

/// Everything an agent needs for one run.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub message: String,
    pub session_id: String,
    pub intent: String,
    pub action: RuleAction,
    pub urgency: Urgency,
    /// Retrieved chunks plus attached session files.
    pub context: Vec<RetrievedChunk>,
}

impl AgentRequest {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            intent: super::rule::UNKNOWN_INTENT.to_string(),
            action: RuleAction::Read,
            urgency: Urgency::Low,
            context: Vec::new(),
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>, action: RuleAction) -> Self {
        self.intent = intent.into();
        self.action = action;
        self
    }

    pub fn with_context(mut self, context: Vec<RetrievedChunk>) -> Self {
        self.context = context;
        self
    }
}

/// Normalized output of any agent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub answer_text: String,
    pub intent: String,
    pub agent_id: String,
    pub agent_name: String,
    pub status: AgentStatus,
    pub extra_chunks: Vec<RetrievedChunk>,
    pub agent_session_id: String,
    pub data: serde_json::Value,
}

impl AgentResult {
    pub fn ok(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        intent: impl Into<String>,
        answer_text: impl Into<String>,
    ) -> Self {
        Self {
            answer_text: answer_text.into(),
            intent: intent.into(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            status: AgentStatus::Ok,
            extra_chunks: Vec::new(),
            agent_session_id: Uuid::new_v4().to_string(),
            data: serde_json::Value::Null,
        }
    }

    /// Error slot for an agent that raised, timed out, or was cancelled.
    pub fn error(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        intent: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: AgentStatus::Error,
            data: serde_json::json!({ "error": reason.into() }),
            ..Self::ok(agent_id, agent_name, intent, String::new())
        }
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<RetrievedChunk>) -> Self {
        self.extra_chunks = chunks;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.agent_session_id = session_id.into();
        self
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.data.get("error").and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_result_keeps_reason() {
        let result = AgentResult::error("students", "Students", "students", "timed out");
        assert_eq!(result.status, AgentStatus::Error);
        assert!(result.answer_text.is_empty());
        assert_eq!(result.error_reason(), Some("timed out"));
        assert!(!result.status.is_usable());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
