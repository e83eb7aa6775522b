//! `provost reindex`: reload retrieval indexes from disk.

use anyhow::Result;
use serde::Serialize;

use crate::application::bootstrap::build_retriever;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::Retriever;

#[derive(Debug, Serialize)]
pub struct ReindexOutput {
    pub index_dir: String,
    pub indexes: Vec<String>,
    pub loaded_chunks: usize,
}

impl CommandOutput for ReindexOutput {
    fn to_human(&self) -> String {
        if self.indexes.is_empty() {
            return format!("No indexes found in {}.", self.index_dir);
        }
        format!(
            "Loaded {} chunk(s) from {} index(es): {}",
            self.loaded_chunks,
            self.indexes.len(),
            self.indexes.join(", ")
        )
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let retriever = build_retriever(config).await?;
    let loaded_chunks = retriever.reload().await?;
    output(
        &ReindexOutput {
            index_dir: config.retrieval.index_dir.clone(),
            indexes: retriever.index_names().await,
            loaded_chunks,
        },
        json_mode,
    );
    Ok(())
}
