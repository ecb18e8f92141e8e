//! Risk gate and its individual policy checks

pub mod price;
pub mod position;
pub mod drawdown;
pub mod gate;

pub use price::*;
pub use position::*;
pub use drawdown::*;
pub use gate::*;
