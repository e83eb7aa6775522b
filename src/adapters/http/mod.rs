//! Inbound HTTP surface.

pub mod server;

pub use server::{build_router, ApiServer, ApiState};
