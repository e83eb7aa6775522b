//! Preflight router.
//!
//! A cheap pass over the raw user message that runs before the rule
//! engine. It only locks routing on unambiguous structural markers; every
//! other message is deferred to full intent resolution.

use regex::Regex;
use serde_json::Value;

use crate::domain::models::{state_keys, ExecutionState, RoutingDecision};

/// Agent id that receives locked data queries.
pub const DATA_QUERY_TARGET: &str = "data_query";

const DATA_QUERY_PATTERN: &str =
    r"(?i)^\s*(select\s+.+\s+from\s+\w+|count\s+(all\s+)?\w+\s+(where|by|in)\b|how\s+many\s+\w+\s+(are|were|have|has)\b)";

#[derive(Debug, Clone)]
pub struct PreflightRouter {
    query_prefix: String,
    data_query: Regex,
    /// Whether a lock target is actually registered.
    data_query_available: bool,
}

impl PreflightRouter {
    pub fn new(
        query_prefix: impl Into<String>,
        data_query_available: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            query_prefix: query_prefix.into().to_lowercase(),
            data_query: Regex::new(DATA_QUERY_PATTERN)?,
            data_query_available,
        })
    }

    /// Decide from the execution state alone. Never has side effects.
    pub fn decide(&self, state: &ExecutionState) -> RoutingDecision {
        let Some(message) = state.get(state_keys::USER_MESSAGE).and_then(Value::as_str) else {
            return RoutingDecision::defer("no user message");
        };
        if !self.data_query_available {
            return RoutingDecision::defer("data query agent unavailable");
        }

        let trimmed = message.trim_start();
        if !self.query_prefix.trim().is_empty() && starts_with_ignore_case(trimmed, &self.query_prefix) {
            return RoutingDecision::lock(DATA_QUERY_TARGET, "explicit query prefix");
        }
        if self.data_query.is_match(trimmed) {
            return RoutingDecision::lock(DATA_QUERY_TARGET, "data query heuristic");
        }
        RoutingDecision::defer("no structural marker")
    }

    /// Write the decision fields into the execution state.
    pub fn apply(state: &mut ExecutionState, decision: &RoutingDecision) {
        state.insert(
            state_keys::ENTRY_TARGET.to_string(),
            decision
                .entry_target
                .as_ref()
                .map_or(Value::Null, |t| Value::String(t.clone())),
        );
        state.insert(state_keys::ENTRY_LOCKED.to_string(), Value::Bool(decision.entry_locked));
        state.insert(
            state_keys::ENTRY_REASON.to_string(),
            Value::String(decision.entry_reason.clone()),
        );
    }

    /// Remove the command prefix a locked query was recognised by.
    pub fn strip_prefix<'a>(&self, message: &'a str) -> &'a str {
        let trimmed = message.trim_start();
        if starts_with_ignore_case(trimmed, &self.query_prefix) {
            trimmed[self.query_prefix.len()..].trim()
        } else {
            trimmed.trim_end()
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(message: &str) -> ExecutionState {
        let mut state = ExecutionState::new();
        state.insert(state_keys::USER_MESSAGE.to_string(), Value::String(message.to_string()));
        state
    }

    #[test]
    fn test_query_prefix_locks() {
        let router = PreflightRouter::new("query ", true).unwrap();
        let decision = router.decide(&state("Query students in grade 9"));
        assert!(decision.entry_locked);
        assert_eq!(decision.entry_target.as_deref(), Some(DATA_QUERY_TARGET));
        assert_eq!(decision.entry_reason, "explicit query prefix");
    }

    #[test]
    fn test_data_query_heuristic_locks() {
        let router = PreflightRouter::new("query ", true).unwrap();
        assert!(router.decide(&state("SELECT name FROM students")).entry_locked);
        assert!(router.decide(&state("how many students are absent today")).entry_locked);
        assert!(router.decide(&state("count staff by school")).entry_locked);
    }

    #[test]
    fn test_plain_text_defers() {
        let router = PreflightRouter::new("query ", true).unwrap();
        let decision = router.decide(&state("show students"));
        assert!(!decision.entry_locked);
        assert!(decision.entry_target.is_none());

        // "query" inside a sentence is not a prefix
        assert!(!router.decide(&state("I have a query about buses")).entry_locked);
    }

    #[test]
    fn test_defers_without_target_or_message() {
        let router = PreflightRouter::new("query ", false).unwrap();
        assert!(!router.decide(&state("query students")).entry_locked);

        let router = PreflightRouter::new("query ", true).unwrap();
        assert!(!router.decide(&ExecutionState::new()).entry_locked);
    }

    #[test]
    fn test_apply_writes_fields() {
        let mut state = state("query staff");
        let decision = RoutingDecision::lock(DATA_QUERY_TARGET, "explicit query prefix");
        PreflightRouter::apply(&mut state, &decision);
        assert_eq!(state[state_keys::ENTRY_TARGET], DATA_QUERY_TARGET);
        assert_eq!(state[state_keys::ENTRY_LOCKED], true);
        assert_eq!(state[state_keys::ENTRY_REASON], "explicit query prefix");
    }

    #[test]
    fn test_strip_prefix() {
        let router = PreflightRouter::new("query ", true).unwrap();
        assert_eq!(router.strip_prefix("  QUERY students in grade 9 "), "students in grade 9");
        assert_eq!(router.strip_prefix("how many buses"), "how many buses");
    }
}
