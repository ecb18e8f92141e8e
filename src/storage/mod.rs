//! Trade persistence

pub mod executions;

pub use executions::*;
