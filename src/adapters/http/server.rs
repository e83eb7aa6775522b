//! Inbound HTTP API.
//!
//! Thin axum layer over [`Orchestrator`]: request parsing, error mapping to
//! `{error, code}` bodies, and graceful shutdown. All routing and agent
//! behavior lives in the orchestrator.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::models::{
    AgentOutputEnvelope, ChatMessage, OrchestrationRequest, ServerConfig, SessionFile,
    WorkflowResult,
};
use crate::services::{OrchestrationError, Orchestrator};

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for `POST /api/v1/rag`.
#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub messages: Vec<ChatMessage>,
    pub index: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub files: Vec<SessionFile>,
}

/// One executed agent, as reported to callers.
#[derive(Debug, Serialize)]
pub struct AgentTraceItem {
    pub agent_id: String,
    pub agent_name: String,
    pub intent: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: String,
    pub session_id: String,
    pub agent_trace: Vec<AgentTraceItem>,
    pub partial_failure: bool,
    pub envelopes: Vec<AgentOutputEnvelope>,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub intent: String,
    pub agent_trace: Vec<AgentTraceItem>,
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub loaded_chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct AgentListItem {
    pub intent: String,
    pub agent_type: String,
}

#[derive(Debug, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub intent: String,
    pub priority: i32,
    pub action: String,
    pub keywords: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<OrchestrationError> for ErrorResponse {
    fn from(err: OrchestrationError) -> Self {
        Self {
            error: err.public_message(),
            code: err.code().to_string(),
        }
    }
}

fn api_error(err: OrchestrationError) -> ApiError {
    let status = match &err {
        OrchestrationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        OrchestrationError::TotalFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
        OrchestrationError::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
    };
    (status, Json(ErrorResponse::from(err)))
}

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct ApiState {
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Self {
        Self {
            orchestrator,
            shutdown,
        }
    }
}

pub struct ApiServer {
    config: ServerConfig,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            state: ApiState::new(orchestrator, CancellationToken::new()),
        }
    }

    /// Token cancelled on shutdown; in-flight requests observe it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.enable_cors)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "provost API listening");
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown_token();
        let router = self.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutdown requested, cancelling in-flight requests");
                token.cancel();
            })
            .await?;
        Ok(())
    }
}

pub fn build_router(state: ApiState, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/rag", post(rag))
        .route("/api/v1/admin/reindex", post(reindex))
        .route("/api/v1/agents", get(list_agents))
        .route("/api/v1/rules", get(list_rules))
        .route("/health", get(health_check))
        .with_state(state);

    if enable_cors {
        app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

fn agent_trace(result: &WorkflowResult) -> Vec<AgentTraceItem> {
    result
        .results
        .iter()
        .map(|r| AgentTraceItem {
            agent_id: r.agent_id.clone(),
            agent_name: r.agent_name.clone(),
            intent: r.intent.clone(),
            status: r.status.as_str().to_string(),
        })
        .collect()
}

async fn health_check() -> &'static str {
    "OK"
}

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = OrchestrationRequest::chat(req.message, req.session_id);
    let result = state
        .orchestrator
        .handle_with_cancellation(request, state.shutdown.child_token())
        .await
        .map_err(api_error)?;

    Ok(Json(ChatResponse {
        reply: result.final_answer.clone().unwrap_or_default(),
        intent: result.decision.intent.clone(),
        session_id: result.conversation_id.clone(),
        agent_trace: agent_trace(&result),
        partial_failure: result.partial_failure(),
        envelopes: result.envelopes,
    }))
}

async fn rag(
    State(state): State<ApiState>,
    Json(req): Json<RagRequest>,
) -> Result<Json<RagResponse>, ApiError> {
    let mut request = OrchestrationRequest::rag(req.messages, req.index).with_attachments(req.files);
    request.session_id = req.session_id;
    let result = state
        .orchestrator
        .handle_with_cancellation(request, state.shutdown.child_token())
        .await
        .map_err(api_error)?;

    Ok(Json(RagResponse {
        answer: result.final_answer.clone().unwrap_or_default(),
        intent: result.decision.intent.clone(),
        agent_trace: agent_trace(&result),
    }))
}

async fn reindex(State(state): State<ApiState>) -> Result<Json<ReindexResponse>, ApiError> {
    match state.orchestrator.rag().reload_index().await {
        Ok(loaded_chunks) => Ok(Json(ReindexResponse { loaded_chunks })),
        Err(e) => {
            tracing::error!(error = %e, "reindex failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "The retrieval index could not be reloaded.".to_string(),
                    code: "reindex_failed".to_string(),
                }),
            ))
        }
    }
}

async fn list_agents(State(state): State<ApiState>) -> Json<Vec<AgentListItem>> {
    let agents = state
        .orchestrator
        .planner()
        .registry()
        .list()
        .into_iter()
        .map(|(intent, agent_type)| AgentListItem { intent, agent_type })
        .collect();
    Json(agents)
}

async fn list_rules(State(state): State<ApiState>) -> Json<Vec<RuleSummary>> {
    let rules = state
        .orchestrator
        .engine()
        .catalog()
        .rules()
        .map(|rule| RuleSummary {
            name: rule.name.clone(),
            intent: rule.intent.clone(),
            priority: rule.priority,
            action: rule.action.as_str(),
            keywords: rule.keywords.len(),
        })
        .collect();
    Json(rules)
}
