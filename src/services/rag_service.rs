//! RAG (Retrieval-Augmented Generation) service
//!
//! Thin glue between the orchestrator and the retrieval collaborator.
//! Retrieval is never fatal here: an unreachable index or malformed chunks
//! degrade to an empty context list.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::RetrievedChunk;
use crate::domain::ports::Retriever;

/// Opening line every answer without grounding context starts with.
pub const INSUFFICIENT_CONTEXT_DISCLAIMER: &str =
    "I could not find enough district information to answer this with confidence.";

/// RAG service for grounding agent answers
pub struct RagService {
    retriever: Arc<dyn Retriever>,
    default_index: String,
    top_k: usize,
}

impl RagService {
    /// Create a new RAG service
    ///
    /// # Arguments
    /// * `retriever` - Ranked-context provider
    /// * `default_index` - Index used when a request names none
    /// * `top_k` - Maximum chunks per retrieval
    pub fn new(retriever: Arc<dyn Retriever>, default_index: impl Into<String>, top_k: usize) -> Self {
        Self {
            retriever,
            default_index: default_index.into(),
            top_k,
        }
    }

    pub fn default_index(&self) -> &str {
        &self.default_index
    }

    /// Retrieve relevant context for a query
    ///
    /// # Returns
    /// Chunks ordered by relevance, most relevant first. Empty on any
    /// retrieval failure.
    pub async fn retrieve_context(&self, query: &str, index: Option<&str>) -> Vec<RetrievedChunk> {
        let index = index.unwrap_or(&self.default_index);
        tracing::debug!(index, "retrieving context");

        let chunks = match self.retriever.retrieve(index, query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(index, error = %err, "retrieval failed, continuing without context");
                return Vec::new();
            }
        };

        let total = chunks.len();
        let mut kept: Vec<RetrievedChunk> = chunks
            .into_iter()
            .filter(RetrievedChunk::is_well_formed)
            .collect();
        if kept.len() < total {
            tracing::warn!(
                index,
                dropped = total - kept.len(),
                "discarded malformed retrieval chunks"
            );
        }
        kept.truncate(self.top_k);

        tracing::debug!(index, found = kept.len(), "retrieved context");
        kept
    }

    /// Force the retriever to reload its indexes from disk.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of chunks now loaded
    pub async fn reload_index(&self) -> DomainResult<usize> {
        let count = self.retriever.reload().await?;
        tracing::info!(loaded_chunks = count, "retrieval index reloaded");
        Ok(count)
    }

    /// Build an augmented prompt with retrieved context
    ///
    /// # Arguments
    /// * `question` - The user's question
    /// * `context` - Retrieved chunks, already ranked
    pub fn build_augmented_prompt(question: &str, context: &[RetrievedChunk]) -> String {
        if context.is_empty() {
            return format!(
                "No district context was found for this question. Begin your answer with: \"{INSUFFICIENT_CONTEXT_DISCLAIMER}\"\n\n## Question\n\n{question}"
            );
        }

        let context_str = context
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("[Context {}] (Source: {})\n{}\n", i + 1, chunk.source, chunk.text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r"Use the following district context to answer the question. If the context does not contain the answer, say so rather than guessing.

## Context

{context_str}

## Question

{question}

## Instructions

Cite sources using the context numbers ([Context 1], [Context 2], etc.) when referencing specific information."
        )
    }
}
