//! Fee history and cost strategy optimization

pub mod history;
pub mod statistics;
pub mod optimizer;

pub use history::*;
pub use statistics::*;
pub use optimizer::*;
