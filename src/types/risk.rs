//! Risk gate inputs and decisions

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// A trade the pipeline would like to place, before any risk check.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateTrade {
    pub asset: String,
    pub amount: Decimal,
    pub dex_price: Decimal,
    pub cex_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub initial_value: Decimal,
    pub current_value: Decimal,
}

impl PortfolioSnapshot {
    pub fn new(initial_value: Decimal) -> Self {
        Self {
            initial_value,
            current_value: initial_value,
        }
    }

    /// Drawdown from the initial value, in percent. Gains report zero.
    pub fn drawdown_percent(&self) -> Decimal {
        if self.initial_value <= Decimal::ZERO || self.current_value >= self.initial_value {
            return Decimal::ZERO;
        }
        (self.initial_value - self.current_value) / self.initial_value * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RiskVeto {
    EmergencyShutdown,
    InvalidPrice { dex_price: Decimal, cex_price: Decimal },
    PriceManipulation { divergence_pct: Decimal, threshold_pct: Decimal },
    TradeSizeExceeded { amount: Decimal, max_trade_size: Decimal },
    DrawdownExceeded { drawdown_pct: Decimal, max_drawdown_pct: Decimal },
}

impl fmt::Display for RiskVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskVeto::EmergencyShutdown => write!(f, "Emergency shutdown active"),
            RiskVeto::InvalidPrice { dex_price, cex_price } => write!(
                f,
                "Invalid venue prices: DEX {} / CEX {}",
                dex_price, cex_price
            ),
            RiskVeto::PriceManipulation { divergence_pct, threshold_pct } => write!(
                f,
                "Possible price manipulation: venues diverge {:.2}% (max {}%)",
                divergence_pct, threshold_pct
            ),
            RiskVeto::TradeSizeExceeded { amount, max_trade_size } => write!(
                f,
                "Trade size {} exceeds trade-size limit {}",
                amount, max_trade_size
            ),
            RiskVeto::DrawdownExceeded { drawdown_pct, max_drawdown_pct } => write!(
                f,
                "Portfolio drawdown {:.2}% exceeds limit {}%",
                drawdown_pct, max_drawdown_pct
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDecision {
    pub approved: bool,
    pub veto: Option<RiskVeto>,
}

impl RiskDecision {
    pub fn approve() -> Self {
        Self { approved: true, veto: None }
    }

    pub fn reject(veto: RiskVeto) -> Self {
        Self { approved: false, veto: Some(veto) }
    }

    pub fn reason(&self) -> Option<String> {
        self.veto.as_ref().map(ToString::to_string)
    }
}
