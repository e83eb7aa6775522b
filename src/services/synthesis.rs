//! Fan-out synthesis.
//!
//! Combines the usable results of several agents into one answer. This
//! step never fails: if the model is unavailable or errors, a deterministic
//! merge is used, and failed agents only mark the outcome as degraded.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::models::{AgentResult, AgentStatus};
use crate::domain::ports::{CompletionRequest, LlmClient};

const SYNTHESIS_SYSTEM_PROMPT: &str = "You combine answers from several school district assistants into one reply. \
Keep every fact, drop repetition, and do not invent information.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMethod {
    Llm,
    Merge,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisOutcome {
    pub final_answer: String,
    /// Set when a single agent's answer was used as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer_agent: Option<String>,
    pub method: SynthesisMethod,
    pub degraded: bool,
    pub succeeded_agents: Vec<String>,
    pub failed_agents: Vec<String>,
}

pub struct Synthesizer {
    llm: Option<Arc<dyn LlmClient>>,
    max_tokens: u32,
}

impl Synthesizer {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    pub async fn synthesize(&self, query: &str, results: &[AgentResult]) -> SynthesisOutcome {
        let (usable, failed): (Vec<&AgentResult>, Vec<&AgentResult>) = results
            .iter()
            .partition(|r| r.status.is_usable() && !r.answer_text.trim().is_empty());

        let succeeded_agents: Vec<String> = usable.iter().map(|r| r.agent_id.clone()).collect();
        let failed_agents: Vec<String> = failed.iter().map(|r| r.agent_id.clone()).collect();
        let degraded = !failed_agents.is_empty();
        if degraded {
            tracing::warn!(failed = ?failed_agents, "synthesizing from partial results");
        }

        let mut outcome = SynthesisOutcome {
            final_answer: String::new(),
            final_answer_agent: None,
            method: SynthesisMethod::Merge,
            degraded,
            succeeded_agents,
            failed_agents,
        };

        match usable.as_slice() {
            [] => return outcome,
            [only] => {
                outcome.final_answer = only.answer_text.clone();
                outcome.final_answer_agent = Some(only.agent_id.clone());
                return outcome;
            }
            _ => {}
        }

        if let Some(llm) = &self.llm {
            let request = CompletionRequest::new(SYNTHESIS_SYSTEM_PROMPT, synthesis_prompt(query, &usable))
                .with_max_tokens(self.max_tokens);
            match llm.complete(request).await {
                Ok(text) if !text.trim().is_empty() => {
                    outcome.final_answer = text.trim().to_string();
                    outcome.method = SynthesisMethod::Llm;
                    return outcome;
                }
                Ok(_) => tracing::warn!(provider = llm.provider(), "empty synthesis completion, merging"),
                Err(err) => {
                    tracing::warn!(provider = llm.provider(), error = %err, "synthesis completion failed, merging");
                }
            }
        }

        outcome.final_answer = merge(&usable);
        outcome
    }
}

/// Deterministic per-agent merge in plan order.
pub fn merge(results: &[&AgentResult]) -> String {
    results
        .iter()
        .map(|r| {
            let marker = if r.status == AgentStatus::Partial { " (partial)" } else { "" };
            format!("{}{}:\n{}", r.agent_name, marker, r.answer_text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn synthesis_prompt(query: &str, results: &[&AgentResult]) -> String {
    let answers = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Answer {}] ({})\n{}", i + 1, r.agent_name, r.answer_text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("## Question\n\n{query}\n\n## Answers\n\n{answers}\n\nWrite one combined reply.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        fn provider(&self) -> &'static str {
            "failing"
        }

        async fn complete(&self, _request: CompletionRequest) -> DomainResult<String> {
            Err(DomainError::LlmError("503".to_string()))
        }
    }

    struct FixedLlm;

    #[async_trait]
    impl LlmClient for FixedLlm {
        fn provider(&self) -> &'static str {
            "fixed"
        }

        async fn complete(&self, request: CompletionRequest) -> DomainResult<String> {
            assert!(request.prompt.contains("[Answer 2]"));
            Ok(" combined ".to_string())
        }
    }

    fn results() -> Vec<AgentResult> {
        vec![
            AgentResult::ok("students", "Students", "students", "12 students enrolled."),
            AgentResult::error("staff", "Staff", "staff", "timed out"),
            AgentResult::ok("incidents", "Incidents", "incidents", "2 open incidents."),
        ]
    }

    #[tokio::test]
    async fn test_merge_skips_failed_agents() {
        let outcome = Synthesizer::new(None, 512).synthesize("overview", &results()).await;
        assert!(outcome.degraded);
        assert_eq!(outcome.failed_agents, vec!["staff"]);
        assert_eq!(outcome.succeeded_agents, vec!["students", "incidents"]);
        assert_eq!(outcome.method, SynthesisMethod::Merge);
        assert!(outcome.final_answer.contains("12 students enrolled."));
        assert!(outcome.final_answer.contains("2 open incidents."));
        assert!(!outcome.final_answer.contains("timed out"));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_merge() {
        let outcome = Synthesizer::new(Some(Arc::new(FailingLlm)), 512)
            .synthesize("overview", &results())
            .await;
        assert_eq!(outcome.method, SynthesisMethod::Merge);
        assert!(!outcome.final_answer.is_empty());
    }

    #[tokio::test]
    async fn test_llm_synthesis() {
        let outcome = Synthesizer::new(Some(Arc::new(FixedLlm)), 512)
            .synthesize("overview", &results())
            .await;
        assert_eq!(outcome.method, SynthesisMethod::Llm);
        assert_eq!(outcome.final_answer, "combined");
    }

    #[tokio::test]
    async fn test_single_usable_answer_is_passed_through() {
        let results = vec![
            AgentResult::ok("students", "Students", "students", "12 students enrolled."),
            AgentResult::error("staff", "Staff", "staff", "boom"),
        ];
        let outcome = Synthesizer::new(Some(Arc::new(FailingLlm)), 512)
            .synthesize("overview", &results)
            .await;
        assert_eq!(outcome.final_answer, "12 students enrolled.");
        assert_eq!(outcome.final_answer_agent.as_deref(), Some("students"));
    }
}
