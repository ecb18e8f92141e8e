//! Narrow interfaces to the engine's external collaborators

pub mod price_source;
pub mod http_price;
pub mod financing;
pub mod submission;
pub mod fees;
pub mod ledger;

pub use price_source::*;
pub use http_price::*;
pub use financing::*;
pub use submission::*;
pub use fees::*;
pub use ledger::*;
