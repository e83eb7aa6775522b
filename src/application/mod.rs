//! Application layer: wiring the services and adapters together.

pub mod bootstrap;

pub use bootstrap::{build_orchestrator, AppContext};
