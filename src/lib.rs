//! Provost - intent resolution and multi-agent orchestration
//!
//! Provost turns a free-text request from a school administrator into an
//! intent decision, dispatches it to one or more specialized agents, and
//! returns a single answer with routing metadata.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the port traits
//! - **Service Layer** (`services`): rule engine, planner, orchestrator
//! - **Adapters** (`adapters`): agents, LLM/data/retrieval clients, sqlite, HTTP
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **Application Layer** (`application`): wiring
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use provost::application::build_orchestrator;
//! use provost::domain::models::{Config, OrchestrationRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = build_orchestrator(&Config::default()).await?;
//!     let result = orchestrator
//!         .handle(OrchestrationRequest::chat("show withdrawn students", None))
//!         .await?;
//!     println!("{}", result.final_answer.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AgentOutputEnvelope, AgentRequest, AgentResult, AgentStatus, Config, IntentDecision,
    OrchestrationRequest, WorkflowResult,
};
pub use domain::ports::{Agent, ConversationRepository, DataService, LlmClient, Retriever};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AgentRegistry, HeuristicRuleEngine, OrchestrationError, Orchestrator};
