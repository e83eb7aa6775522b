//! Schema-constrained wrapper around agent output for downstream consumers.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

use super::agent::{AgentResult, AgentStatus};
use super::rule::{IntentDecision, RuleAction, Urgency};

/// Sub-tone attached when an answer was produced without grounding context.
pub const SUB_TONE_INSUFFICIENT_CONTEXT: &str = "insufficient_context";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Informative,
    Supportive,
    Urgent,
    Apologetic,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeAction {
    Read,
    Create,
    Update,
    Delete,
    List,
    Answer,
    Clarify,
}

impl From<&RuleAction> for EnvelopeAction {
    fn from(action: &RuleAction) -> Self {
        match action {
            RuleAction::Read => Self::Read,
            RuleAction::Create => Self::Create,
            RuleAction::Update => Self::Update,
            RuleAction::Delete => Self::Delete,
            RuleAction::ShowWithdrawn(_) => Self::List,
            RuleAction::Other(_) => Self::Answer,
        }
    }
}

/// Structured content; undeclared fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredContent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeContent {
    Text(String),
    Structured(StructuredContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentOutputEnvelope {
    pub intent: String,
    pub tone: Tone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_tone: Option<String>,
    pub action: EnvelopeAction,
    pub content: EnvelopeContent,
}

impl AgentOutputEnvelope {
    /// Parse and validate an envelope produced by an external agent.
    pub fn from_json(value: serde_json::Value) -> DomainResult<Self> {
        let envelope: Self = serde_json::from_value(value)
            .map_err(|e| DomainError::EnvelopeValidation(e.to_string()))?;
        if envelope.intent.trim().is_empty() {
            return Err(DomainError::EnvelopeValidation(
                "intent must not be empty".to_string(),
            ));
        }
        Ok(envelope)
    }

    /// Wrap an agent result using the decision that routed to it.
    pub fn from_result(result: &AgentResult, decision: &IntentDecision) -> Self {
        let insufficient_context = result
            .data
            .get(SUB_TONE_INSUFFICIENT_CONTEXT)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let tone = match result.status {
            AgentStatus::Error => Tone::Apologetic,
            AgentStatus::Partial => Tone::Supportive,
            AgentStatus::Ok if decision.urgency == Urgency::High => Tone::Urgent,
            AgentStatus::Ok if decision.is_unknown() => Tone::Neutral,
            AgentStatus::Ok => Tone::Informative,
        };

        let action = if result.status == AgentStatus::Partial {
            EnvelopeAction::Clarify
        } else if decision.is_unknown() {
            EnvelopeAction::Answer
        } else {
            EnvelopeAction::from(&decision.action)
        };

        let items = result
            .data
            .get("items")
            .and_then(serde_json::Value::as_array)
            .cloned();
        let content = match items {
            Some(items) => EnvelopeContent::Structured(StructuredContent {
                summary: result.answer_text.clone(),
                total: Some(items.len() as u64),
                items,
            }),
            None => EnvelopeContent::Text(result.answer_text.clone()),
        };

        Self {
            intent: result.intent.clone(),
            tone,
            sub_tone: insufficient_context.then(|| SUB_TONE_INSUFFICIENT_CONTEXT.to_string()),
            action,
            content,
        }
    }
}
