//! Agent registry: normalized intent key to a constructible agent.
//!
//! Built explicitly at startup and then shared read-only. Tests build
//! their own isolated registry instead of touching process-wide state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::domain::ports::Agent;

type AgentConstructor = Arc<dyn Fn() -> Arc<dyn Agent> + Send + Sync>;

struct RegisteredAgent {
    type_name: String,
    constructor: AgentConstructor,
}

/// Trim and lower-case an intent key.
pub fn normalize_key(intent_key: &str) -> String {
    intent_key.trim().to_lowercase()
}

fn short_type_name<A>() -> String {
    let full = std::any::type_name::<A>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

#[derive(Default)]
pub struct AgentRegistry {
    entries: HashMap<String, RegisteredAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor. The last registration for a key wins.
    pub fn register<A, F>(&mut self, intent_key: &str, constructor: F)
    where
        A: Agent + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let key = normalize_key(intent_key);
        let type_name = short_type_name::<A>();
        let constructor: AgentConstructor = Arc::new(move || Arc::new(constructor()) as Arc<dyn Agent>);

        if let Some(previous) = self.entries.get(&key) {
            tracing::warn!(
                intent = %key,
                previous = %previous.type_name,
                replacement = %type_name,
                "overwriting agent registration"
            );
        }

        self.entries.insert(
            key,
            RegisteredAgent {
                type_name,
                constructor,
            },
        );
    }

    /// Register an already-built, shared agent instance.
    pub fn register_shared(&mut self, intent_key: &str, agent: Arc<dyn Agent>) {
        let key = normalize_key(intent_key);
        let type_name = agent.name().to_string();
        if self.entries.contains_key(&key) {
            tracing::warn!(intent = %key, replacement = %type_name, "overwriting agent registration");
        }
        self.entries.insert(
            key,
            RegisteredAgent {
                type_name,
                constructor: Arc::new(move || Arc::clone(&agent)),
            },
        );
    }

    /// `None` means "no specialized agent"; callers fall back.
    pub fn resolve(&self, intent_key: &str) -> Option<Arc<dyn Agent>> {
        self.entries
            .get(&normalize_key(intent_key))
            .map(|entry| (entry.constructor)())
    }

    pub fn contains(&self, intent_key: &str) -> bool {
        self.entries.contains_key(&normalize_key(intent_key))
    }

    /// Intent key to agent type name, sorted by key.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.type_name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.list())
            .finish()
    }
}
