//! Wiring: configuration in, a ready [`Orchestrator`] out.
//!
//! Each collaborator has its own builder so CLI commands can construct only
//! what they need (e.g. `classify` never opens the database).

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::agents::{builtin_registry, AgentDependencies};
use crate::adapters::data_service::HttpDataService;
use crate::adapters::embeddings::{HashingEmbedder, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::adapters::llm::build_llm_client;
use crate::adapters::retrieval::FileIndexRetriever;
use crate::adapters::sqlite::{initialize_database, SqliteConversationRepository};
use crate::domain::models::{Config, EmbedderKind};
use crate::domain::ports::{DataService, EmbeddingProvider, LlmClient};
use crate::services::{
    AgentRegistry, ConversationService, ExecutionPlanner, ExecutionSettings, HeuristicRuleEngine,
    Orchestrator, PlannerSettings, PreflightRouter, RagService, RuleCatalog, Synthesizer,
    DATA_QUERY_TARGET,
};

/// Everything a running server needs.
pub struct AppContext {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Build the full stack, including the conversation store.
    pub async fn build(config: Config) -> Result<Self> {
        let orchestrator = build_orchestrator(&config).await?;

        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize conversation store")?;
        let conversations = ConversationService::new(
            Arc::new(SqliteConversationRepository::new(pool)),
            config.orchestration.history_limit,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator.with_conversations(Arc::new(conversations))),
            config: Arc::new(config),
        })
    }
}

pub fn build_engine(config: &Config) -> Result<Arc<HeuristicRuleEngine>> {
    let catalog = RuleCatalog::load(&config.rules).context("Failed to load rule catalog")?;
    Ok(Arc::new(HeuristicRuleEngine::new(Arc::new(catalog))))
}

pub fn build_data_service(config: &Config) -> Result<Option<Arc<dyn DataService>>> {
    let service = HttpDataService::from_config(&config.data_service)?;
    Ok(service.map(|s| Arc::new(s) as Arc<dyn DataService>))
}

pub fn build_registry(config: &Config, llm: Option<Arc<dyn LlmClient>>) -> Result<AgentRegistry> {
    let deps = AgentDependencies {
        llm,
        data_service: build_data_service(config)?,
        entities: config.data_service.entities.clone(),
        max_tokens: config.llm.max_tokens,
    };
    Ok(builtin_registry(&deps))
}

pub fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.retrieval.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.retrieval.embedding_dimension)?),
        EmbedderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig {
            dimension: config.retrieval.embedding_dimension,
            ..OpenAiEmbeddingConfig::default()
        })?),
    };
    Ok(embedder)
}

pub async fn build_retriever(config: &Config) -> Result<Arc<FileIndexRetriever>> {
    let retriever = FileIndexRetriever::open(&config.retrieval.index_dir, build_embedder(config)?)
        .await
        .with_context(|| format!("Failed to open retrieval indexes in {}", config.retrieval.index_dir))?;
    Ok(Arc::new(retriever))
}

/// The orchestrator without a conversation store.
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let engine = build_engine(config)?;
    let llm = build_llm_client(&config.llm)?;
    let registry = build_registry(config, llm.clone())?;

    let preflight = PreflightRouter::new(
        config.orchestration.query_prefix.clone(),
        registry.contains(DATA_QUERY_TARGET),
    )?;

    let orchestration = &config.orchestration;
    if !registry.contains(&orchestration.fallback_agent) {
        tracing::warn!(
            fallback = %orchestration.fallback_agent,
            "fallback agent is not registered; unknown intents will fail"
        );
    }
    let planner = ExecutionPlanner::new(
        Arc::new(registry),
        PlannerSettings {
            fallback_agent: orchestration.fallback_agent.clone(),
            fan_out_max: orchestration.fan_out_max,
            fan_out_min_confidence: orchestration.fan_out_min_confidence,
        },
    );

    let retriever = build_retriever(config).await?;
    let rag = Arc::new(RagService::new(
        retriever,
        config.retrieval.default_index.clone(),
        config.retrieval.top_k,
    ));

    Ok(Orchestrator::new(
        engine,
        preflight,
        planner,
        rag,
        Synthesizer::new(llm, config.llm.max_tokens),
        ExecutionSettings::from(orchestration),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.database.path = dir.path().join("provost.db").display().to_string();
        config.retrieval.index_dir = dir.path().join("indexes").display().to_string();
        config
    }

    #[tokio::test]
    async fn test_build_offline_context() {
        let dir = tempfile::tempdir().unwrap();
        let context = AppContext::build(temp_config(&dir)).await.unwrap();

        let orchestrator = &context.orchestrator;
        assert!(orchestrator.conversations().is_some());
        assert!(orchestrator.planner().registry().contains("general"));
        assert!(!orchestrator.planner().registry().contains("students"));
        assert!(!orchestrator.engine().catalog().is_empty());
    }

    #[test]
    fn test_registry_with_data_service() {
        let mut config = Config::default();
        config.data_service.base_url = Some("http://localhost:9".to_string());
        let registry = build_registry(&config, None).unwrap();
        assert!(registry.contains(DATA_QUERY_TARGET));
        assert!(registry.contains("finance"));
    }
}
