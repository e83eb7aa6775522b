//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - Agent: a specialized answerer dispatched by intent
//! - Retriever / EmbeddingProvider: ranked context for grounding
//! - LlmClient: model completions
//! - DataService: the district data API the entity agents wrap
//! - ConversationRepository: resumable session state

pub mod agent;
pub mod conversation_repository;
pub mod data_service;
pub mod embedding;
pub mod llm;
pub mod retriever;

pub use agent::Agent;
pub use conversation_repository::ConversationRepository;
pub use data_service::DataService;
pub use embedding::EmbeddingProvider;
pub use llm::{CompletionRequest, LlmClient};
pub use retriever::Retriever;
