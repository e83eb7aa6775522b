//! Agent port - the single capability every specialized agent implements.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentRequest, AgentResult};

/// A unit of capability that answers requests for one or more intents.
///
/// Dispatch is static: the orchestrator only ever calls [`Agent::run`]
/// through this trait.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier recorded in routing metadata (e.g. "students").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Whether the orchestrator should retrieve context before running.
    fn wants_retrieval(&self) -> bool {
        false
    }

    /// Run one request. May suspend on network or model calls.
    ///
    /// Errors are captured by the orchestrator as `status=error` on this
    /// agent's slot; they never abort sibling agents.
    async fn run(&self, request: AgentRequest) -> DomainResult<AgentResult>;
}
