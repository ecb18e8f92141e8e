//! Funded trade execution, per-asset queueing and paper-trading adapters

pub mod orchestrator;
pub mod queue;
pub mod simulation;

pub use orchestrator::*;
pub use queue::*;
pub use simulation::*;
