//! This crate is intended to contain code that is required to provide or
//! improve the observability of the exchange. That includes initialization
//! logic for metrics and logging as well as logging helper functions.
pub mod config;
pub mod future;
pub mod metrics;
pub mod request_id;
pub mod tracing;

pub use config::Config;
