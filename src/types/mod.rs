//! Core data types and structures

pub mod price;
pub mod opportunity;
pub mod risk;
pub mod cost;
pub mod execution;
pub mod events;
pub mod health;

pub use price::*;
pub use opportunity::*;
pub use risk::*;
pub use cost::*;
pub use execution::*;
pub use events::*;
pub use health::*;
