//! Spread Arbitrage Bot - DEX/CEX spread detection and funded execution
//!
//! Watches paired DEX and CEX quotes, gates qualifying spreads through
//! ordered risk checks, prices execution cost from a rolling fee history
//! and attempts funded trades across every configured funding combination.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod adapters;
pub mod arbitrage;
pub mod risk;
pub mod cost;
pub mod execution;
pub mod engine;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use engine::{ArbitrageEngine, Collaborators};
pub use errors::{EngineError, EngineResult};
pub use types::*;
