//! Domain models for intent resolution and orchestration.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod envelope;
pub mod retrieval;
pub mod rule;
pub mod workflow;

pub use agent::{AgentRequest, AgentResult, AgentStatus};
pub use config::{
    Config, DataServiceConfig, DatabaseConfig, EmbedderKind, LlmConfig, LlmProvider,
    LoggingConfig, OrchestrationConfig, RetrievalConfig, RulesConfig, ServerConfig,
};
pub use conversation::{ConversationState, SaveOutcome};
pub use envelope::{
    AgentOutputEnvelope, EnvelopeAction, EnvelopeContent, StructuredContent, Tone,
    SUB_TONE_INSUFFICIENT_CONTEXT,
};
pub use retrieval::{RetrievedChunk, SessionFile, SESSION_FILE_SOURCE};
pub use rule::{
    DecisionSource, HeuristicRule, IntentDecision, RuleAction, RuleMatch, Urgency,
    UNKNOWN_INTENT,
};
pub use workflow::{
    state_keys, ChatMessage, ExecutionState, GraphPattern, OrchestrationRequest, RequestSource,
    RoutingDecision, RoutingMeta, WorkflowResult, WorkflowStage,
};
