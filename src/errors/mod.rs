//! Error types and the failure circuit breaker

pub mod engine_error;
pub mod circuit_breaker;

pub use engine_error::*;
pub use circuit_breaker::*;
