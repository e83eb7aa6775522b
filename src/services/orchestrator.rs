//! Request orchestration.
//!
//! Drives one request through preflight, classification, planning,
//! execution and (for fan-out plans) synthesis. Partial failures stay
//! inside this module: agent errors become `status=error` slots, retrieval
//! errors become empty context, and checkpoint errors are only logged.
//! [`OrchestrationError`] is the only error a caller ever sees.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    state_keys, AgentOutputEnvelope, AgentRequest, AgentResult, DecisionSource, ExecutionState,
    IntentDecision, OrchestrationConfig, OrchestrationRequest, RetrievedChunk, RoutingMeta,
    WorkflowResult, WorkflowStage,
};
use crate::services::conversation_service::ConversationService;
use crate::services::execution_plan::{ExecutionPlan, ExecutionPlanner, PlannedAgent};
use crate::services::preflight::PreflightRouter;
use crate::services::rag_service::RagService;
use crate::services::rule_engine::HeuristicRuleEngine;
use crate::services::synthesis::Synthesizer;

/// The only error that crosses the orchestration boundary.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request {request_id} failed: no agent produced an answer")]
    TotalFailure {
        request_id: String,
        failed_agents: Vec<String>,
    },

    #[error("Request {request_id} was cancelled")]
    Cancelled { request_id: String },
}

impl OrchestrationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::TotalFailure { .. } => "total_failure",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Message safe to show an end user. Carries no internal detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(reason) => reason.clone(),
            Self::TotalFailure { .. } => {
                "Sorry, I couldn't answer that right now. Please try again later.".to_string()
            }
            Self::Cancelled { .. } => "The request was cancelled.".to_string(),
        }
    }
}

/// Per-invocation execution knobs.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub agent_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl From<&OrchestrationConfig> for ExecutionSettings {
    fn from(config: &OrchestrationConfig) -> Self {
        Self {
            agent_timeout_ms: config.agent_timeout_ms,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }
}

/// Validated stage transitions, mirrored into the execution state.
#[derive(Debug)]
struct StageTracker {
    current: WorkflowStage,
}

impl StageTracker {
    fn start(state: &mut ExecutionState) -> Self {
        state.insert(
            state_keys::STAGES.to_string(),
            json!([WorkflowStage::Received.as_str()]),
        );
        Self {
            current: WorkflowStage::Received,
        }
    }

    fn advance(&mut self, next: WorkflowStage, state: &mut ExecutionState) -> DomainResult<()> {
        if !self.current.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(from = %self.current, to = %next, "workflow stage");
        self.current = next;
        if let Some(Value::Array(stages)) = state.get_mut(state_keys::STAGES) {
            stages.push(Value::String(next.as_str().to_string()));
        }
        Ok(())
    }

    /// Advance or move to `Failed`, surfacing a generic failure.
    fn enter(
        &mut self,
        next: WorkflowStage,
        state: &mut ExecutionState,
        request_id: &str,
    ) -> Result<(), OrchestrationError> {
        self.advance(next, state).map_err(|err| {
            tracing::error!(error = %err, "illegal workflow transition");
            self.fail(state);
            OrchestrationError::TotalFailure {
                request_id: request_id.to_string(),
                failed_agents: Vec::new(),
            }
        })
    }

    fn fail(&mut self, state: &mut ExecutionState) {
        if let Err(err) = self.advance(WorkflowStage::Failed, state) {
            tracing::debug!(error = %err, "workflow already terminal");
        }
    }
}

pub struct Orchestrator {
    engine: Arc<HeuristicRuleEngine>,
    preflight: PreflightRouter,
    planner: ExecutionPlanner,
    rag: Arc<RagService>,
    synthesizer: Synthesizer,
    conversations: Option<Arc<ConversationService>>,
    settings: ExecutionSettings,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<HeuristicRuleEngine>,
        preflight: PreflightRouter,
        planner: ExecutionPlanner,
        rag: Arc<RagService>,
        synthesizer: Synthesizer,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            engine,
            preflight,
            planner,
            rag,
            synthesizer,
            conversations: None,
            settings,
        }
    }

    /// Checkpoint every completed turn through this service.
    pub fn with_conversations(mut self, conversations: Arc<ConversationService>) -> Self {
        self.conversations = Some(conversations);
        self
    }

    pub fn engine(&self) -> &HeuristicRuleEngine {
        &self.engine
    }

    pub fn planner(&self) -> &ExecutionPlanner {
        &self.planner
    }

    pub fn rag(&self) -> &RagService {
        &self.rag
    }

    pub fn conversations(&self) -> Option<&ConversationService> {
        self.conversations.as_deref()
    }

    pub async fn handle(
        &self,
        request: OrchestrationRequest,
    ) -> Result<WorkflowResult, OrchestrationError> {
        self.handle_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Handle a request until it completes or `cancel` fires.
    ///
    /// Cancelling drops every in-flight agent and retrieval future.
    #[tracing::instrument(
        skip_all,
        fields(request_id = tracing::field::Empty, conversation_id = tracing::field::Empty)
    )]
    pub async fn handle_with_cancellation(
        &self,
        request: OrchestrationRequest,
        cancel: CancellationToken,
    ) -> Result<WorkflowResult, OrchestrationError> {
        let Some(message) = request.latest_user_message().map(str::to_string) else {
            return Err(OrchestrationError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        };

        let request_id = Uuid::new_v4().to_string();
        let conversation_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        let span = tracing::Span::current();
        span.record("request_id", request_id.as_str());
        span.record("conversation_id", conversation_id.as_str());

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!("request cancelled");
                Err(OrchestrationError::Cancelled { request_id })
            }
            result = self.run(&request, message, request_id.clone(), conversation_id) => result,
        }
    }

    async fn run(
        &self,
        request: &OrchestrationRequest,
        message: String,
        request_id: String,
        conversation_id: String,
    ) -> Result<WorkflowResult, OrchestrationError> {
        let mut state = ExecutionState::new();
        state.insert(state_keys::REQUEST_ID.to_string(), json!(request_id));
        state.insert(state_keys::CONVERSATION_ID.to_string(), json!(conversation_id));
        state.insert(state_keys::USER_MESSAGE.to_string(), json!(message));
        let mut stages = StageTracker::start(&mut state);

        let prior = match &self.conversations {
            Some(conversations) => conversations.load(&conversation_id).await,
            None => None,
        };
        if let Some(prior) = &prior {
            state.insert(
                state_keys::PRIOR_STATE.to_string(),
                json!({
                    "turn_count": prior.turn_count(),
                    "last_intent": prior.get("last_intent").cloned().unwrap_or(Value::Null),
                }),
            );
        }

        stages.enter(WorkflowStage::Preflight, &mut state, &request_id)?;
        let routing = self.preflight.decide(&state);
        PreflightRouter::apply(&mut state, &routing);

        let decision = match routing.entry_target.as_deref() {
            Some(target) if routing.entry_locked => {
                tracing::info!(target, reason = %routing.entry_reason, "preflight locked entry");
                IntentDecision::locked(target)
            }
            _ => {
                stages.enter(WorkflowStage::Classified, &mut state, &request_id)?;
                self.engine.evaluate(&message)
            }
        };
        state.insert(
            state_keys::INTENT_DECISION.to_string(),
            serde_json::to_value(&decision).unwrap_or(Value::Null),
        );

        stages.enter(WorkflowStage::Planned, &mut state, &request_id)?;
        let Some(plan) = self.planner.plan(&decision, &routing, request.source) else {
            tracing::error!(intent = %decision.intent, "no agent or fallback could be resolved");
            stages.fail(&mut state);
            return Err(OrchestrationError::TotalFailure {
                request_id,
                failed_agents: Vec::new(),
            });
        };
        state.insert(state_keys::FALLBACK_USED.to_string(), json!(plan.fallback_used));
        tracing::info!(
            intent = %decision.intent,
            workflow = %plan.workflow_id,
            agents = ?plan.agent_ids(),
            "execution planned"
        );

        stages.enter(WorkflowStage::Executing, &mut state, &request_id)?;
        let agent_message = if routing.entry_locked {
            self.preflight.strip_prefix(&message).to_string()
        } else {
            message.clone()
        };
        let mut pre_agents = vec!["preflight".to_string()];
        let mut context = if plan.needs_retrieval {
            pre_agents.push("retrieval".to_string());
            self.rag.retrieve_context(&message, request.index.as_deref()).await
        } else {
            Vec::new()
        };
        record_chunks(&mut state, &context);
        context.extend(request.attachments.iter().map(RetrievedChunk::from_session_file));

        let base_request = AgentRequest {
            message: agent_message,
            session_id: conversation_id.clone(),
            intent: decision.intent.clone(),
            action: decision.action.clone(),
            urgency: decision.urgency,
            context,
        };

        let mut results = self.execute_plan(&plan, &decision, &base_request).await;
        let mut executed_agents = plan.agent_ids();

        let fallback = self
            .planner
            .resolve_fallback()
            .filter(|f| !plan.contains_agent(f.agent_id()));
        if let (false, Some(fallback)) = (results.iter().any(|r| r.status.is_usable()), fallback) {
            tracing::warn!(
                fallback = fallback.agent_id(),
                "every planned agent failed, running fallback"
            );
            let mut fallback_request = base_request.clone();
            if fallback.agent.wants_retrieval() && !plan.needs_retrieval {
                pre_agents.push("retrieval".to_string());
                let chunks = self
                    .rag
                    .retrieve_context(&message, request.index.as_deref())
                    .await;
                record_chunks(&mut state, &chunks);
                let attached = std::mem::take(&mut fallback_request.context);
                fallback_request.context = chunks;
                fallback_request.context.extend(attached);
            }
            executed_agents.push(fallback.agent_id().to_string());
            results.push(self.invoke(&fallback, fallback_request).await);
            state.insert(state_keys::FALLBACK_USED.to_string(), json!(true));
        }

        if !results.iter().any(|r| r.status.is_usable()) {
            let failed_agents: Vec<String> = results.iter().map(|r| r.agent_id.clone()).collect();
            tracing::error!(failed = ?failed_agents, "total failure");
            stages.fail(&mut state);
            return Err(OrchestrationError::TotalFailure {
                request_id,
                failed_agents,
            });
        }

        let partial_failure = results.iter().any(|r| !r.status.is_usable());
        let (final_answer, final_answer_agent) = if plan.is_fan_out() {
            stages.enter(WorkflowStage::Synthesizing, &mut state, &request_id)?;
            let outcome = self.synthesizer.synthesize(&message, &results).await;
            state.insert(
                state_keys::SYNTHESIS.to_string(),
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            );
            (outcome.final_answer, outcome.final_answer_agent)
        } else {
            results
                .iter()
                .rev()
                .find(|r| r.status.is_usable())
                .map_or((String::new(), None), |r| {
                    (r.answer_text.clone(), Some(r.agent_id.clone()))
                })
        };
        state.insert(state_keys::PARTIAL_FAILURE.to_string(), json!(partial_failure));

        stages.enter(WorkflowStage::Completed, &mut state, &request_id)?;

        let envelopes = results
            .iter()
            .map(|r| AgentOutputEnvelope::from_result(r, &decision_for(&decision, &plan, r)))
            .collect();

        let result = WorkflowResult {
            request_id,
            conversation_id,
            query: message,
            routing: RoutingMeta {
                source: request.source.as_str().to_string(),
                planned_agents: plan.agent_ids(),
                executed_agents,
                pre_agents,
                selected_workflow_id: plan.workflow_id.clone(),
                graph_pattern: plan.graph_pattern,
            },
            decision,
            envelopes,
            results,
            execution_state: state,
            final_answer: Some(final_answer),
            final_answer_agent,
            stage: stages.current,
        };

        if let Some(conversations) = &self.conversations {
            conversations.checkpoint(prior.as_ref(), &result).await;
        }

        tracing::info!(
            intent = %result.decision.intent,
            executed = ?result.routing.executed_agents,
            partial_failure,
            "request completed"
        );
        Ok(result)
    }

    /// Run every planned agent concurrently; results keep plan order.
    async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        decision: &IntentDecision,
        base_request: &AgentRequest,
    ) -> Vec<AgentResult> {
        let invocations = plan.agents.iter().map(|planned| {
            let mut request = base_request.clone();
            if planned.intent != decision.intent {
                request.intent = planned.intent.clone();
                request.action = planned.action.clone();
            }
            self.invoke(planned, request)
        });
        join_all(invocations).await
    }

    /// One agent with retries on transient errors.
    ///
    /// Every attempt and backoff shares a single deadline of
    /// `agent_timeout_ms`, so a hanging agent costs its slot one timeout.
    async fn invoke(&self, planned: &PlannedAgent, request: AgentRequest) -> AgentResult {
        let agent_id = planned.agent_id().to_string();
        let deadline = Instant::now() + Duration::from_millis(self.settings.agent_timeout_ms);
        let mut last_error: Option<DomainError> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(self.settings.retry_backoff_ms) * attempt;
                if Instant::now() + backoff >= deadline {
                    tracing::warn!(agent_id = %agent_id, attempt, "no time left to retry agent");
                    break;
                }
                tracing::info!(agent_id = %agent_id, attempt, ?backoff, "retrying agent");
                tokio::time::sleep(backoff).await;
            }

            match timeout_at(deadline, planned.agent.run(request.clone())).await {
                Ok(Ok(result)) => {
                    tracing::debug!(agent_id = %agent_id, status = result.status.as_str(), "agent finished");
                    return result;
                }
                Ok(Err(err)) => {
                    tracing::warn!(agent_id = %agent_id, attempt, error = %err, "agent failed");
                    let transient = err.is_transient();
                    last_error = Some(err);
                    if !transient {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        agent_id = %agent_id,
                        attempt,
                        timeout_ms = self.settings.agent_timeout_ms,
                        "agent timed out"
                    );
                    last_error = Some(DomainError::AgentTimeout {
                        agent_id: agent_id.clone(),
                        timeout_ms: self.settings.agent_timeout_ms,
                    });
                    break;
                }
            }
        }

        let reason = last_error.map_or_else(|| "agent did not run".to_string(), |e| e.to_string());
        AgentResult::error(agent_id, planned.agent.name(), request.intent, reason)
    }
}

/// Decision an individual result is presented under.
fn decision_for(decision: &IntentDecision, plan: &ExecutionPlan, result: &AgentResult) -> IntentDecision {
    if result.intent == decision.intent {
        return decision.clone();
    }
    let action = plan
        .agents
        .iter()
        .find(|p| p.agent_id() == result.agent_id)
        .map(|p| p.action.clone())
        .unwrap_or_default();
    IntentDecision {
        intent: result.intent.clone(),
        action,
        source: DecisionSource::Fallback,
        ..decision.clone()
    }
}

fn record_chunks(state: &mut ExecutionState, chunks: &[RetrievedChunk]) {
    let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    state.insert(
        state_keys::RETRIEVED_CHUNKS.to_string(),
        json!({ "count": chunks.len(), "sources": sources }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_public_messages() {
        let total = OrchestrationError::TotalFailure {
            request_id: "r1".to_string(),
            failed_agents: vec!["students".to_string()],
        };
        assert_eq!(total.code(), "total_failure");
        assert!(!total.public_message().contains("students"));
        assert_eq!(
            OrchestrationError::InvalidRequest("message must not be empty".to_string()).code(),
            "invalid_request"
        );
        assert_eq!(
            OrchestrationError::Cancelled {
                request_id: "r1".to_string()
            }
            .code(),
            "cancelled"
        );
    }

    #[test]
    fn test_stage_tracker_rejects_skips() {
        let mut state = ExecutionState::new();
        let mut tracker = StageTracker::start(&mut state);
        assert!(tracker.advance(WorkflowStage::Preflight, &mut state).is_ok());
        assert!(tracker.advance(WorkflowStage::Completed, &mut state).is_err());
        assert!(tracker.advance(WorkflowStage::Failed, &mut state).is_ok());
        assert_eq!(state[state_keys::STAGES], json!(["received", "preflight", "failed"]));
    }
}
