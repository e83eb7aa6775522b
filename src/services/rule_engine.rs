//! Heuristic rule engine: free text to one ranked intent decision.
//!
//! Evaluation is a pure function over the shared [`RuleCatalog`]; the same
//! text and catalog always produce the same decision.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::models::{DecisionSource, IntentDecision, RuleMatch};
use crate::services::rule_catalog::{CompiledRule, RuleCatalog};

/// Trim and lower-case input before matching.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A rule that fired on the input.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub compiled: &'a CompiledRule,
    pub matched_keyword: &'a str,
}

impl Candidate<'_> {
    /// Ascending priority, then descending confidence, then declaration order.
    fn rank(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.compiled.rule, &other.compiled.rule);
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| {
                self.compiled
                    .declaration_index
                    .cmp(&other.compiled.declaration_index)
            })
    }

    fn to_match(self) -> RuleMatch {
        let rule = &self.compiled.rule;
        RuleMatch {
            rule_name: rule.name.clone(),
            intent: rule.intent.clone(),
            action: rule.action.clone(),
            priority: rule.priority,
            confidence: rule.confidence,
            matched_keyword: self.matched_keyword.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeuristicRuleEngine {
    catalog: Arc<RuleCatalog>,
}

impl HeuristicRuleEngine {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Every firing rule, best first.
    pub fn candidates(&self, text: &str) -> Vec<Candidate<'_>> {
        let normalized = normalize(text);
        let mut candidates: Vec<Candidate<'_>> = self
            .catalog
            .compiled()
            .iter()
            .filter_map(|compiled| {
                compiled
                    .first_match(&normalized)
                    .map(|matched_keyword| Candidate {
                        compiled,
                        matched_keyword,
                    })
            })
            .collect();
        candidates.sort_by(Candidate::rank);
        candidates
    }

    /// Resolve text to exactly one decision. No match is `intent = "unknown"`.
    pub fn evaluate(&self, text: &str) -> IntentDecision {
        let mut ranked = self.candidates(text).into_iter();
        let Some(winner) = ranked.next() else {
            tracing::debug!("no heuristic rule fired");
            return IntentDecision::unknown();
        };

        let rule = &winner.compiled.rule;
        let decision = IntentDecision {
            intent: rule.intent.trim().to_lowercase(),
            action: rule.action.clone(),
            confidence: rule.confidence,
            urgency: rule.urgency,
            urgency_confidence: rule.urgency_confidence,
            matched_rule_name: Some(rule.name.clone()),
            matched_keyword: Some(winner.matched_keyword.to_string()),
            alternative_matches: ranked.map(Candidate::to_match).collect(),
            source: DecisionSource::Rules,
        };

        tracing::debug!(
            intent = %decision.intent,
            rule = %rule.name,
            alternatives = decision.alternative_matches.len(),
            "heuristic rule matched"
        );
        decision
    }
}
