//! File-backed retrieval index.
//!
//! Each index is one JSON file, `<index_dir>/<index>.json`, holding an array
//! of `{id, text, source?, embedding?}` records. Records without an
//! embedding are embedded at load time. Scoring is cosine similarity; equal
//! scores keep file order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RetrievedChunk;
use crate::domain::ports::{EmbeddingProvider, Retriever};

#[derive(Debug, Deserialize)]
struct IndexRecord {
    id: String,
    text: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    id: String,
    text: String,
    source: String,
    embedding: Vec<f32>,
}

pub struct FileIndexRetriever {
    index_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    indexes: RwLock<HashMap<String, Vec<IndexedChunk>>>,
}

impl FileIndexRetriever {
    /// An empty retriever; call [`Retriever::reload`] to load the directory.
    pub fn new(index_dir: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index_dir: index_dir.into(),
            embedder,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Create and load every index in `index_dir`.
    pub async fn open(
        index_dir: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> DomainResult<Self> {
        let retriever = Self::new(index_dir, embedder);
        retriever.reload().await?;
        Ok(retriever)
    }

    pub async fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn load_index_file(&self, index: &str, path: &Path) -> DomainResult<Vec<IndexedChunk>> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::RetrievalFailed(format!("failed to read {}: {e}", path.display()))
        })?;
        let records: Vec<IndexRecord> = serde_json::from_str(&raw).map_err(|e| {
            DomainError::RetrievalFailed(format!("malformed index {}: {e}", path.display()))
        })?;

        let missing: Vec<String> = records
            .iter()
            .filter(|r| r.embedding.is_none())
            .map(|r| r.text.clone())
            .collect();
        let mut computed = self.embedder.embed_batch(&missing).await?.into_iter();

        let mut chunks = Vec::with_capacity(records.len());
        for record in records {
            let embedding = match record.embedding {
                Some(embedding) => embedding,
                None => computed.next().ok_or_else(|| {
                    DomainError::EmbeddingFailed("embedder returned too few vectors".to_string())
                })?,
            };
            chunks.push(IndexedChunk {
                id: record.id,
                text: record.text,
                source: record.source.unwrap_or_else(|| index.to_string()),
                embedding,
            });
        }
        Ok(chunks)
    }
}

/// Cosine similarity; zero when either vector is empty, zero-norm, or the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl Retriever for FileIndexRetriever {
    async fn retrieve(
        &self,
        index: &str,
        query: &str,
        top_k: usize,
    ) -> DomainResult<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(query).await?;

        let indexes = self.indexes.read().await;
        let Some(chunks) = indexes.get(index) else {
            tracing::debug!(index, "unknown retrieval index");
            return Ok(Vec::new());
        };

        let mut scored: Vec<RetrievedChunk> = chunks
            .iter()
            .map(|chunk| {
                RetrievedChunk::new(
                    chunk.id.clone(),
                    chunk.text.clone(),
                    chunk.source.clone(),
                    cosine_similarity(&query_vector, &chunk.embedding),
                )
            })
            .collect();
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn reload(&self) -> DomainResult<usize> {
        let mut loaded = HashMap::new();

        match tokio::fs::read_dir(&self.index_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await.map_err(|e| {
                    DomainError::RetrievalFailed(format!("failed to list index directory: {e}"))
                })? {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    let Some(index) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                    else {
                        continue;
                    };
                    match self.load_index_file(&index, &path).await {
                        Ok(chunks) => {
                            tracing::debug!(index = %index, chunks = chunks.len(), "loaded retrieval index");
                            loaded.insert(index, chunks);
                        }
                        Err(err) => {
                            tracing::warn!(index = %index, error = %err, "skipping retrieval index");
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.index_dir.display(), "retrieval index directory does not exist");
            }
            Err(err) => {
                return Err(DomainError::RetrievalFailed(format!(
                    "failed to open {}: {err}",
                    self.index_dir.display()
                )));
            }
        }

        let total = loaded.values().map(Vec::len).sum();
        *self.indexes.write().await = loaded;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::HashingEmbedder;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedder::new(128).unwrap())
    }

    fn write_index(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{name}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_cosine() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            "handbook",
            r#"[
                {"id": "menu", "text": "Cafeteria menu for the spring semester"},
                {"id": "bus", "text": "The late bus schedule changes on Fridays", "source": "transport.pdf"}
            ]"#,
        );
        let retriever = FileIndexRetriever::open(dir.path(), embedder()).await.unwrap();

        let chunks = retriever.retrieve("handbook", "late bus schedule", 1).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "bus");
        assert_eq!(chunks[0].source, "transport.pdf");
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            "ties",
            r#"[
                {"id": "a", "text": "one", "embedding": [1.0, 0.0]},
                {"id": "b", "text": "two", "embedding": [1.0, 0.0]},
                {"id": "c", "text": "three", "embedding": [1.0, 0.0]}
            ]"#,
        );
        let retriever = FileIndexRetriever::open(dir.path(), embedder()).await.unwrap();
        // Dimension mismatch with the query scores every chunk 0.0.
        let ids: Vec<String> = retriever
            .retrieve("ties", "anything", 3)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_index_and_reload_count() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = FileIndexRetriever::open(dir.path(), embedder()).await.unwrap();
        assert!(retriever.retrieve("missing", "bus", 5).await.unwrap().is_empty());

        write_index(dir.path(), "district", r#"[{"id": "1", "text": "Board meets Tuesday"}]"#);
        write_index(dir.path(), "broken", "{ not json");
        assert_eq!(retriever.reload().await.unwrap(), 1);
        assert_eq!(retriever.index_names().await, vec!["district"]);
    }

    #[tokio::test]
    async fn test_missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = FileIndexRetriever::new(dir.path().join("absent"), embedder());
        assert_eq!(retriever.reload().await.unwrap(), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < 1e-6);
    }
}
