//! Per-request orchestration records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::agent::AgentResult;
use super::envelope::AgentOutputEnvelope;
use super::retrieval::SessionFile;
use super::rule::IntentDecision;

/// Free-form per-request state shared between orchestration stages.
pub type ExecutionState = serde_json::Map<String, serde_json::Value>;

/// Keys the orchestrator reads and writes in [`ExecutionState`].
pub mod state_keys {
    pub const REQUEST_ID: &str = "request_id";
    pub const CONVERSATION_ID: &str = "conversation_id";
    pub const USER_MESSAGE: &str = "user_message";
    pub const ENTRY_TARGET: &str = "entry_target";
    pub const ENTRY_LOCKED: &str = "entry_locked";
    pub const ENTRY_REASON: &str = "entry_reason";
    pub const INTENT_DECISION: &str = "intent_decision";
    pub const STAGES: &str = "stages";
    pub const PARTIAL_FAILURE: &str = "partial_failure";
    pub const SYNTHESIS: &str = "synthesis";
    pub const FALLBACK_USED: &str = "fallback_used";
    pub const RETRIEVED_CHUNKS: &str = "retrieved_chunks";
    pub const PRIOR_STATE: &str = "prior_state";
}

/// Execution shape for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphPattern {
    SingleAgent,
    FanOutSynthesis,
}

/// Lifecycle of one orchestrated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Received,
    Preflight,
    Classified,
    Planned,
    Executing,
    Synthesizing,
    Completed,
    Failed,
}

impl WorkflowStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Preflight => "preflight",
            Self::Classified => "classified",
            Self::Planned => "planned",
            Self::Executing => "executing",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Preflight may skip classification; any non-terminal stage may fail.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (from, Self::Failed) => !from.is_terminal(),
            (Self::Received, Self::Preflight)
            | (Self::Preflight, Self::Classified | Self::Planned)
            | (Self::Classified, Self::Planned)
            | (Self::Planned, Self::Executing)
            | (Self::Executing, Self::Synthesizing | Self::Completed)
            | (Self::Synthesizing, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    #[default]
    Chat,
    Rag,
}

impl RequestSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Rag => "rag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Inbound request accepted by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationRequest {
    pub messages: Vec<ChatMessage>,
    pub session_id: Option<String>,
    /// Target retrieval index; set for RAG-style requests.
    pub index: Option<String>,
    pub attachments: Vec<SessionFile>,
    pub source: RequestSource,
}

impl OrchestrationRequest {
    pub fn chat(message: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(message)],
            session_id,
            ..Self::default()
        }
    }

    pub fn rag(messages: Vec<ChatMessage>, index: impl Into<String>) -> Self {
        Self {
            messages,
            index: Some(index.into()),
            source: RequestSource::Rag,
            ..Self::default()
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<SessionFile>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The most recent user turn, trimmed.
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role.eq_ignore_ascii_case("user"))
            .map(|m| m.content.trim())
            .filter(|m| !m.is_empty())
    }
}

/// Preflight outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub entry_target: Option<String>,
    pub entry_locked: bool,
    pub entry_reason: String,
}

impl RoutingDecision {
    pub fn defer(reason: impl Into<String>) -> Self {
        Self {
            entry_target: None,
            entry_locked: false,
            entry_reason: reason.into(),
        }
    }

    pub fn lock(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entry_target: Some(target.into()),
            entry_locked: true,
            entry_reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMeta {
    pub source: String,
    pub planned_agents: Vec<String>,
    pub executed_agents: Vec<String>,
    pub pre_agents: Vec<String>,
    pub selected_workflow_id: String,
    pub graph_pattern: GraphPattern,
}

/// Aggregated result of one orchestrated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub request_id: String,
    pub conversation_id: String,
    pub query: String,
    pub decision: IntentDecision,
    pub routing: RoutingMeta,
    pub envelopes: Vec<AgentOutputEnvelope>,
    pub results: Vec<AgentResult>,
    pub execution_state: ExecutionState,
    pub final_answer: Option<String>,
    pub final_answer_agent: Option<String>,
    pub stage: WorkflowStage,
}

impl WorkflowResult {
    pub fn partial_failure(&self) -> bool {
        self.execution_state
            .get(state_keys::PARTIAL_FAILURE)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
