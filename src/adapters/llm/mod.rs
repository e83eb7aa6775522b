//! LLM provider clients.

pub mod anthropic;
pub mod openai_compatible;

use std::sync::Arc;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use openai_compatible::{OpenAiCompatibleClient, OpenAiCompatibleConfig};

use crate::domain::errors::DomainResult;
use crate::domain::models::{LlmConfig, LlmProvider};
use crate::domain::ports::LlmClient;

/// Build the configured client. `offline` means no client at all.
pub fn build_llm_client(config: &LlmConfig) -> DomainResult<Option<Arc<dyn LlmClient>>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Offline => return Ok(None),
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            Arc::new(OpenAiCompatibleClient::new(OpenAiCompatibleConfig::from(config))?)
        }
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(AnthropicConfig::from(config))?),
    };
    tracing::info!(provider = client.provider(), model = %config.model, "llm client configured");
    Ok(Some(client))
}
