//! Shared utilities for stock-pair
//!
//! Currently this is the tracing setup used by the binaries.

pub mod logging;

pub use logging::{init_tracing, init_tracing_json};
