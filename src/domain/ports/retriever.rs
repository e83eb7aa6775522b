//! Retrieval collaborator port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RetrievedChunk;

/// Ranked-context provider. The orchestrator does not own the index.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` chunks from `index`, best first; ties keep insertion order.
    ///
    /// Every call re-scans; results are not resumable.
    async fn retrieve(&self, index: &str, query: &str, top_k: usize)
        -> DomainResult<Vec<RetrievedChunk>>;

    /// Reload all indexes from their backing store, returning the chunk count.
    async fn reload(&self) -> DomainResult<usize>;
}
