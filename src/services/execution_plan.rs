//! Execution planning: intent decision to an ordered set of agents.
//!
//! A plan is either a single agent or a fan-out whose results are
//! synthesized. Plans always keep planning order; executed results are
//! reported in the same order regardless of completion order.

use std::sync::Arc;

use crate::domain::models::{
    GraphPattern, IntentDecision, RequestSource, RoutingDecision, RuleAction,
};
use crate::domain::ports::Agent;
use crate::services::agent_registry::{normalize_key, AgentRegistry};

pub const WORKFLOW_SINGLE_AGENT: &str = "single_agent";
pub const WORKFLOW_FAN_OUT: &str = "fan_out_synthesis";
pub const WORKFLOW_RAG_ANSWER: &str = "rag_answer";
pub const WORKFLOW_PREFLIGHT_LOCKED: &str = "preflight_locked";

/// One agent slot in a plan.
#[derive(Clone)]
pub struct PlannedAgent {
    /// Registry key the agent was resolved from.
    pub intent: String,
    pub action: RuleAction,
    pub agent: Arc<dyn Agent>,
}

impl PlannedAgent {
    pub fn agent_id(&self) -> &str {
        self.agent.id()
    }
}

impl std::fmt::Debug for PlannedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedAgent")
            .field("intent", &self.intent)
            .field("action", &self.action)
            .field("agent_id", &self.agent.id())
            .finish()
    }
}

/// Resolved execution plan for one request.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub agents: Vec<PlannedAgent>,
    pub graph_pattern: GraphPattern,
    pub workflow_id: String,
    /// Whether the winning intent had no agent and the fallback was planned.
    pub fallback_used: bool,
    /// Retrieve context before running the agents.
    pub needs_retrieval: bool,
}

impl ExecutionPlan {
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|p| p.agent_id().to_string()).collect()
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|p| p.agent_id() == agent_id)
    }

    pub fn is_fan_out(&self) -> bool {
        self.graph_pattern == GraphPattern::FanOutSynthesis
    }
}

/// Knobs for fan-out planning.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub fallback_agent: String,
    pub fan_out_max: usize,
    pub fan_out_min_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlanner {
    registry: Arc<AgentRegistry>,
    settings: PlannerSettings,
}

impl ExecutionPlanner {
    pub fn new(registry: Arc<AgentRegistry>, settings: PlannerSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn fallback_agent(&self) -> &str {
        &self.settings.fallback_agent
    }

    /// Resolve the fallback agent on its own.
    pub fn resolve_fallback(&self) -> Option<PlannedAgent> {
        self.registry
            .resolve(&self.settings.fallback_agent)
            .map(|agent| PlannedAgent {
                intent: normalize_key(&self.settings.fallback_agent),
                action: RuleAction::Read,
                agent,
            })
    }

    /// Build a plan. `None` only when not even the fallback agent resolves.
    pub fn plan(
        &self,
        decision: &IntentDecision,
        routing: &RoutingDecision,
        source: RequestSource,
    ) -> Option<ExecutionPlan> {
        if routing.entry_locked {
            if let Some(target) = routing.entry_target.as_deref() {
                if let Some(agent) = self.registry.resolve(target) {
                    return Some(self.finish(
                        vec![PlannedAgent {
                            intent: normalize_key(target),
                            action: decision.action.clone(),
                            agent,
                        }],
                        false,
                        Some(WORKFLOW_PREFLIGHT_LOCKED),
                        source,
                    ));
                }
                tracing::warn!(target, "preflight target is not registered, planning fallback");
            }
        }

        let Some(winner) = self.registry.resolve(&decision.intent) else {
            tracing::debug!(intent = %decision.intent, "no specialized agent, planning fallback");
            let fallback = self.resolve_fallback()?;
            return Some(self.finish(vec![fallback], true, None, source));
        };

        let winner_intent = normalize_key(&decision.intent);
        let mut agents = vec![PlannedAgent {
            intent: winner_intent,
            action: decision.action.clone(),
            agent: winner,
        }];

        for alternative in &decision.alternative_matches {
            if agents.len() >= self.settings.fan_out_max {
                break;
            }
            if alternative.confidence < self.settings.fan_out_min_confidence {
                continue;
            }
            let intent = normalize_key(&alternative.intent);
            if agents.iter().any(|p| p.intent == intent) {
                continue;
            }
            let Some(agent) = self.registry.resolve(&intent) else {
                continue;
            };
            if agents.iter().any(|p| p.agent_id() == agent.id()) {
                continue;
            }
            agents.push(PlannedAgent {
                intent,
                action: alternative.action.clone(),
                agent,
            });
        }

        Some(self.finish(agents, false, None, source))
    }

    fn finish(
        &self,
        agents: Vec<PlannedAgent>,
        fallback_used: bool,
        workflow: Option<&str>,
        source: RequestSource,
    ) -> ExecutionPlan {
        let graph_pattern = if agents.len() > 1 {
            GraphPattern::FanOutSynthesis
        } else {
            GraphPattern::SingleAgent
        };
        let workflow_id = match (workflow, source) {
            (Some(id), _) => id,
            (None, RequestSource::Rag) => WORKFLOW_RAG_ANSWER,
            (None, RequestSource::Chat) if agents.len() > 1 => WORKFLOW_FAN_OUT,
            (None, RequestSource::Chat) => WORKFLOW_SINGLE_AGENT,
        };
        let needs_retrieval =
            source == RequestSource::Rag || agents.iter().any(|p| p.agent.wants_retrieval());

        ExecutionPlan {
            agents,
            graph_pattern,
            workflow_id: workflow_id.to_string(),
            fallback_used,
            needs_retrieval,
        }
    }
}
