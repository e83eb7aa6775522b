//! CLI command implementations.

pub mod agents;
pub mod classify;
pub mod reindex;
pub mod rules;
pub mod serve;
