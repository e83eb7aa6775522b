//! Agents shipped with provost.
//!
//! The registry is built from the explicit list in [`builtin_registry`];
//! nothing is discovered at runtime.

pub mod data_query;
pub mod entity;
pub mod general;

use std::sync::Arc;

pub use data_query::DataQueryAgent;
pub use entity::EntityListAgent;
pub use general::{GeneralAgent, GENERAL_AGENT_ID};

use crate::domain::ports::{DataService, LlmClient};
use crate::services::{AgentRegistry, DATA_QUERY_TARGET};

/// Collaborators the built-in agents are constructed with.
#[derive(Clone, Default)]
pub struct AgentDependencies {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub data_service: Option<Arc<dyn DataService>>,
    pub entities: Vec<String>,
    pub max_tokens: u32,
}

pub fn builtin_registry(deps: &AgentDependencies) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    let llm = deps.llm.clone();
    let max_tokens = deps.max_tokens;
    registry.register(GENERAL_AGENT_ID, move || GeneralAgent::new(llm.clone(), max_tokens));

    match &deps.data_service {
        Some(data) => {
            let query_data = Arc::clone(data);
            registry.register(DATA_QUERY_TARGET, move || DataQueryAgent::new(Arc::clone(&query_data)));
            for entity in &deps.entities {
                let entity_data = Arc::clone(data);
                let name = entity.clone();
                registry.register(entity, move || {
                    EntityListAgent::new(name.clone(), Arc::clone(&entity_data))
                });
            }
        }
        None => tracing::info!("no data service configured, entity agents disabled"),
    }

    tracing::debug!(agents = registry.len(), "built agent registry");
    registry
}
