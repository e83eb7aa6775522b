//! District data service adapters.

pub mod http;

pub use http::HttpDataService;
