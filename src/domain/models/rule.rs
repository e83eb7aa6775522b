//! Heuristic rule and intent decision models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Intent key reserved for "no rule fired".
pub const UNKNOWN_INTENT: &str = "unknown";

/// What the user wants done with the intent's data.
///
/// The set is open: catalogs may declare actions this enum does not name,
/// which round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleAction {
    #[default]
    Read,
    Create,
    Update,
    Delete,
    /// `show_withdrawn_<entity>`; holds the entity suffix.
    ShowWithdrawn(String),
    Other(String),
}

impl RuleAction {
    pub fn as_str(&self) -> String {
        match self {
            Self::Read => "read".to_string(),
            Self::Create => "create".to_string(),
            Self::Update => "update".to_string(),
            Self::Delete => "delete".to_string(),
            Self::ShowWithdrawn(entity) => format!("show_withdrawn_{entity}"),
            Self::Other(s) => s.clone(),
        }
    }

    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl From<String> for RuleAction {
    fn from(s: String) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "read" => Self::Read,
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => match other.strip_prefix("show_withdrawn_") {
                Some(entity) if !entity.is_empty() => Self::ShowWithdrawn(entity.to_string()),
                _ => Self::Other(lower),
            },
        }
    }
}

impl From<RuleAction> for String {
    fn from(action: RuleAction) -> Self {
        action.as_str()
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Urgency a rule attaches to its intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

const fn default_word_boundary() -> bool {
    true
}

/// Declarative keyword matcher loaded from the rule catalog.
///
/// Immutable after load; lower `priority` is preferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRule {
    pub name: String,
    pub intent: String,
    pub priority: i32,
    pub keywords: Vec<String>,
    #[serde(default = "default_word_boundary")]
    pub word_boundary: bool,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub urgency_confidence: f64,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl HeuristicRule {
    pub fn new(
        name: impl Into<String>,
        intent: impl Into<String>,
        priority: i32,
        keywords: &[&str],
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            intent: intent.into(),
            priority,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            word_boundary: true,
            action: RuleAction::Read,
            urgency: Urgency::Low,
            urgency_confidence: 0.0,
            confidence,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency, confidence: f64) -> Self {
        self.urgency = urgency;
        self.urgency_confidence = confidence;
        self
    }

    pub fn with_word_boundary(mut self, word_boundary: bool) -> Self {
        self.word_boundary = word_boundary;
        self
    }
}

/// A firing rule that lost to the winner, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_name: String,
    pub intent: String,
    pub action: RuleAction,
    pub priority: i32,
    pub confidence: f64,
    pub matched_keyword: String,
}

/// How an intent decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    #[default]
    Rules,
    Preflight,
    Fallback,
}

/// Outcome of evaluating the rule catalog against one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub intent: String,
    pub action: RuleAction,
    pub confidence: f64,
    pub urgency: Urgency,
    pub urgency_confidence: f64,
    pub matched_rule_name: Option<String>,
    pub matched_keyword: Option<String>,
    pub alternative_matches: Vec<RuleMatch>,
    #[serde(default)]
    pub source: DecisionSource,
}

impl IntentDecision {
    /// Terminal "no rule fired" decision.
    pub fn unknown() -> Self {
        Self {
            intent: UNKNOWN_INTENT.to_string(),
            action: RuleAction::Read,
            confidence: 0.0,
            urgency: Urgency::Low,
            urgency_confidence: 0.0,
            matched_rule_name: None,
            matched_keyword: None,
            alternative_matches: Vec::new(),
            source: DecisionSource::Rules,
        }
    }

    /// Decision produced by a preflight entry lock.
    pub fn locked(target: &str) -> Self {
        Self {
            intent: target.to_string(),
            confidence: 1.0,
            source: DecisionSource::Preflight,
            ..Self::unknown()
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.intent == UNKNOWN_INTENT
    }
}
