//! Common test utilities for integration tests
//!
//! Scripted agents, canned retrievers, and an orchestrator wired with the
//! built-in rule catalog and short timeouts.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use provost::adapters::agents::GeneralAgent;
use provost::domain::errors::{DomainError, DomainResult};
use provost::domain::models::{AgentRequest, AgentResult, RetrievedChunk};
use provost::domain::ports::{Agent, Retriever};
use provost::services::{
    AgentRegistry, ExecutionPlanner, ExecutionSettings, HeuristicRuleEngine, Orchestrator,
    PlannerSettings, PreflightRouter, RagService, RuleCatalog, Synthesizer, DATA_QUERY_TARGET,
};

/// Per-attempt agent timeout used by [`orchestrator`].
pub const TEST_AGENT_TIMEOUT_MS: u64 = 150;

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// How a [`ScriptedAgent`] behaves on each call.
#[derive(Debug, Clone)]
enum Script {
    Answer(String),
    /// Fail transiently this many times, then answer.
    FlakyThen(u32, String),
    AlwaysFail,
    /// Fail with a non-retryable error.
    Reject,
    Hang,
}

/// Agent whose behavior is fixed up front. Records every request it sees.
pub struct ScriptedAgent {
    id: String,
    script: Script,
    delay: Duration,
    wants_retrieval: bool,
    calls: AtomicU32,
    seen: Mutex<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    fn with_script(id: &str, script: Script) -> Self {
        Self {
            id: id.to_string(),
            script,
            delay: Duration::ZERO,
            wants_retrieval: false,
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(id: &str, answer: &str) -> Self {
        Self::with_script(id, Script::Answer(answer.to_string()))
    }

    pub fn flaky(id: &str, failures: u32, answer: &str) -> Self {
        Self::with_script(id, Script::FlakyThen(failures, answer.to_string()))
    }

    pub fn failing(id: &str) -> Self {
        Self::with_script(id, Script::AlwaysFail)
    }

    pub fn rejecting(id: &str) -> Self {
        Self::with_script(id, Script::Reject)
    }

    /// Never finishes on its own; only a timeout or cancellation ends it.
    pub fn hanging(id: &str) -> Self {
        Self::with_script(id, Script::Hang)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_retrieval(mut self) -> Self {
        self.wants_retrieval = true;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<AgentRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn wants_retrieval(&self) -> bool {
        self.wants_retrieval
    }

    async fn run(&self, request: AgentRequest) -> DomainResult<AgentResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Answer(answer) => Ok(AgentResult::ok(&self.id, &self.id, &request.intent, answer)),
            Script::FlakyThen(failures, answer) if call >= *failures => {
                Ok(AgentResult::ok(&self.id, &self.id, &request.intent, answer))
            }
            Script::FlakyThen(..) | Script::AlwaysFail => Err(DomainError::AgentFailed {
                agent_id: self.id.clone(),
                reason: format!("scripted failure on call {call}"),
            }),
            Script::Reject => Err(DomainError::ValidationFailed("scripted rejection".to_string())),
            Script::Hang => std::future::pending().await,
        }
    }
}

/// Retriever returning the same chunks for every query.
#[derive(Default)]
pub struct StaticRetriever {
    chunks: Vec<RetrievedChunk>,
    calls: AtomicU32,
}

impl StaticRetriever {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<RetrievedChunk>) -> Self {
        Self {
            chunks,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _index: &str, _query: &str, top_k: usize) -> DomainResult<Vec<RetrievedChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chunks.iter().take(top_k).cloned().collect())
    }

    async fn reload(&self) -> DomainResult<usize> {
        Ok(self.chunks.len())
    }
}

/// Retriever whose every call fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, index: &str, _query: &str, _top_k: usize) -> DomainResult<Vec<RetrievedChunk>> {
        Err(DomainError::RetrievalFailed(format!("index {index} is offline")))
    }

    async fn reload(&self) -> DomainResult<usize> {
        Err(DomainError::RetrievalFailed("index is offline".to_string()))
    }
}

pub fn chunk(id: &str, text: &str) -> RetrievedChunk {
    RetrievedChunk::new(id, text, "handbook.pdf", 0.9)
}

/// Registry holding the offline general agent under `general`.
pub fn registry_with_general() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register("general", || GeneralAgent::new(None, 256));
    registry
}

pub fn test_settings() -> ExecutionSettings {
    ExecutionSettings {
        agent_timeout_ms: TEST_AGENT_TIMEOUT_MS,
        max_retries: 1,
        retry_backoff_ms: 5,
    }
}

/// Orchestrator over the built-in rule catalog with short timeouts.
pub fn orchestrator(registry: AgentRegistry, retriever: Arc<dyn Retriever>) -> Orchestrator {
    orchestrator_with(registry, retriever, test_settings())
}

pub fn orchestrator_with(
    registry: AgentRegistry,
    retriever: Arc<dyn Retriever>,
    settings: ExecutionSettings,
) -> Orchestrator {
    let catalog = RuleCatalog::builtin().expect("built-in catalog must load");
    let engine = Arc::new(HeuristicRuleEngine::new(Arc::new(catalog)));
    let preflight = PreflightRouter::new("query ", registry.contains(DATA_QUERY_TARGET))
        .expect("preflight pattern must compile");
    let planner = ExecutionPlanner::new(
        Arc::new(registry),
        PlannerSettings {
            fallback_agent: "general".to_string(),
            fan_out_max: 3,
            fan_out_min_confidence: 0.8,
        },
    );
    let rag = Arc::new(RagService::new(retriever, "district", 4));
    Orchestrator::new(engine, preflight, planner, rag, Synthesizer::new(None, 256), settings)
}
