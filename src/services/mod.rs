//! Service layer: intent resolution and request orchestration.

pub mod agent_registry;
pub mod conversation_service;
pub mod execution_plan;
pub mod orchestrator;
pub mod preflight;
pub mod rag_service;
pub mod rule_catalog;
pub mod rule_engine;
pub mod synthesis;

pub use agent_registry::AgentRegistry;
pub use conversation_service::ConversationService;
pub use execution_plan::{ExecutionPlan, ExecutionPlanner, PlannedAgent, PlannerSettings};
pub use orchestrator::{ExecutionSettings, OrchestrationError, Orchestrator};
pub use preflight::{PreflightRouter, DATA_QUERY_TARGET};
pub use rag_service::{RagService, INSUFFICIENT_CONTEXT_DISCLAIMER};
pub use rule_catalog::{CatalogError, RuleCatalog};
pub use rule_engine::HeuristicRuleEngine;
pub use synthesis::{SynthesisOutcome, Synthesizer};
