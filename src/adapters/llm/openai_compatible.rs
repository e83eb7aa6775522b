//! OpenAI-compatible chat completions client.
//!
//! Serves both `openai` and `ollama` (through its `/v1` compatibility
//! endpoint). The API key is optional for local servers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LlmConfig, LlmProvider};
use crate::domain::ports::{CompletionRequest, LlmClient};
use crate::infrastructure::logging::scrub_secrets;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl From<&LlmConfig> for OpenAiCompatibleConfig {
    fn from(config: &LlmConfig) -> Self {
        let api_key = config.api_key.clone().or_else(|| match config.provider {
            LlmProvider::OpenAi => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        });
        Self {
            provider: config.provider,
            api_key,
            base_url: config.effective_base_url(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatibleClient {
    config: OpenAiCompatibleConfig,
    http: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(config: OpenAiCompatibleConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::LlmError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> &'static str {
        self.config.provider.as_str()
    }

    async fn complete(&self, request: CompletionRequest) -> DomainResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let mut builder = self.http.post(&url).json(&ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        });
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::LlmError(format!(
                "API error {status}: {}",
                scrub_secrets(&body)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::LlmError(format!("Malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DomainError::LlmError("Response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server, api_key: Option<&str>) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(OpenAiCompatibleConfig {
            provider: LlmProvider::Ollama,
            api_key: api_key.map(str::to_string),
            base_url: server.url(),
            model: "llama3".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer local-key")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"llama3"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Buses leave at 7:40."}}]}"#)
            .create_async()
            .await;

        let text = client(&server, Some("local-key"))
            .complete(CompletionRequest::new("system", "When do buses leave?"))
            .await
            .unwrap();
        assert_eq!(text, "Buses leave at 7:40.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let result = client(&server, None)
            .complete(CompletionRequest::new("", "hi"))
            .await;
        assert!(matches!(result, Err(DomainError::LlmError(_))));
    }

    #[test]
    fn test_provider_name() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            ..LlmConfig::default()
        };
        let client = OpenAiCompatibleClient::new(OpenAiCompatibleConfig::from(&config)).unwrap();
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.config.base_url, "http://localhost:11434/v1");
    }
}
