//! Retry policy shared by every external call

pub mod retry;

pub use retry::*;
