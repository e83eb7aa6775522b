//! Adapters implementing the domain ports, plus the inbound HTTP surface.

pub mod agents;
pub mod data_service;
pub mod embeddings;
pub mod http;
pub mod llm;
pub mod retrieval;
pub mod sqlite;
