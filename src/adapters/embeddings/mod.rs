//! Embedding providers for the retrieval index.

pub mod hashing;
pub mod openai;

pub use hashing::HashingEmbedder;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
