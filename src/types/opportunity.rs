//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::Venue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeDirection {
    BuyDexSellCex,
    BuyCexSellDex,
}

impl TradeDirection {
    pub fn buy_venue(&self) -> Venue {
        match self {
            TradeDirection::BuyDexSellCex => Venue::Dex,
            TradeDirection::BuyCexSellDex => Venue::Cex,
        }
    }
}

/// Spread assessment of a single observation. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySignal {
    pub asset: String,
    pub dex_price: Decimal,
    pub cex_price: Decimal,
    pub spread_absolute: Decimal,
    pub spread_percent: Decimal,
    pub direction: TradeDirection,
    pub qualifies: bool,
    pub observed_at: DateTime<Utc>,
}

impl OpportunitySignal {
    pub fn buy_price(&self) -> Decimal {
        self.dex_price.min(self.cex_price)
    }

    pub fn sell_price(&self) -> Decimal {
        self.dex_price.max(self.cex_price)
    }

    /// Gross profit of moving `amount` across the spread, before costs.
    pub fn expected_profit(&self, amount: Decimal) -> Decimal {
        self.spread_absolute * amount
    }
}
