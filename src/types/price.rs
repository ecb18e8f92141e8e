//! Price observation types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two venues a spread is measured between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Dex,
    Cex,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Dex => write!(f, "DEX"),
            Venue::Cex => write!(f, "CEX"),
        }
    }
}

/// A pair of venue prices for one asset, immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub asset: String,
    pub dex_price: Decimal,
    pub cex_price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(asset: impl Into<String>, dex_price: Decimal, cex_price: Decimal) -> Self {
        Self {
            asset: asset.into(),
            dex_price,
            cex_price,
            observed_at: Utc::now(),
        }
    }
}
