//! Infrastructure layer module
//!
//! Cross-cutting concerns that are not ports:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;
