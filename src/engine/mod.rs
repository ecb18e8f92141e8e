//! Engine wiring: event bus, tick pipeline and lifecycle

pub mod events;
pub mod lifecycle;
pub mod pipeline;

pub use events::*;
pub use lifecycle::*;
pub use pipeline::*;
