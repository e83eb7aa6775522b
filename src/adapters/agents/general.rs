//! Fallback agent that answers from retrieved district context.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentRequest, AgentResult, RetrievedChunk, SUB_TONE_INSUFFICIENT_CONTEXT};
use crate::domain::ports::{Agent, CompletionRequest, LlmClient};
use crate::services::{RagService, INSUFFICIENT_CONTEXT_DISCLAIMER};

pub const GENERAL_AGENT_ID: &str = "general";

const SYSTEM_PROMPT: &str = "You are a district assistant for school administrators. \
Answer only from the supplied context and keep answers short.";

/// Chunks quoted verbatim by the offline answer.
const EXTRACTIVE_CHUNKS: usize = 3;

pub struct GeneralAgent {
    llm: Option<Arc<dyn LlmClient>>,
    max_tokens: u32,
}

impl GeneralAgent {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    async fn complete(&self, prompt: String) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let request = CompletionRequest::new(SYSTEM_PROMPT, prompt).with_max_tokens(self.max_tokens);
        match llm.complete(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(provider = llm.provider(), "empty completion, answering extractively");
                None
            }
            Err(err) => {
                tracing::warn!(provider = llm.provider(), error = %err, "completion failed, answering extractively");
                None
            }
        }
    }

    async fn answer_without_context(&self, request: &AgentRequest) -> AgentResult {
        let prompt = RagService::build_augmented_prompt(&request.message, &[]);
        let answer = match self.complete(prompt).await {
            Some(text) if text.starts_with(INSUFFICIENT_CONTEXT_DISCLAIMER) => text,
            Some(text) => format!("{INSUFFICIENT_CONTEXT_DISCLAIMER} {text}"),
            None => format!(
                "{INSUFFICIENT_CONTEXT_DISCLAIMER} Try naming the school, program, or record you are asking about."
            ),
        };
        AgentResult::ok(GENERAL_AGENT_ID, self.name(), &request.intent, answer)
            .with_session(request.session_id.clone())
            .with_data(json!({ SUB_TONE_INSUFFICIENT_CONTEXT: true }))
    }
}

fn extractive_answer(context: &[RetrievedChunk]) -> String {
    let mut lines = vec!["Here is what the district records say:".to_string()];
    lines.extend(
        context
            .iter()
            .take(EXTRACTIVE_CHUNKS)
            .map(|chunk| format!("- {} ({})", chunk.text.trim(), chunk.source)),
    );
    lines.join("\n")
}

#[async_trait]
impl Agent for GeneralAgent {
    fn id(&self) -> &str {
        GENERAL_AGENT_ID
    }

    fn name(&self) -> &str {
        "General"
    }

    fn wants_retrieval(&self) -> bool {
        true
    }

    async fn run(&self, request: AgentRequest) -> DomainResult<AgentResult> {
        if request.context.is_empty() {
            tracing::info!(intent = %request.intent, "no grounding context");
            return Ok(self.answer_without_context(&request).await);
        }

        let prompt = RagService::build_augmented_prompt(&request.message, &request.context);
        let answer = match self.complete(prompt).await {
            Some(text) => text,
            None => extractive_answer(&request.context),
        };

        Ok(
            AgentResult::ok(GENERAL_AGENT_ID, self.name(), &request.intent, answer)
                .with_session(request.session_id.clone())
                .with_chunks(request.context),
        )
    }
}
