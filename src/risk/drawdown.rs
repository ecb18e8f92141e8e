//! Portfolio drawdown check

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::types::{PortfolioSnapshot, RiskVeto};

/// Vetoes once the portfolio has fallen below
/// `(1 - max_drawdown_pct / 100)` of its initial value.
pub fn check_drawdown(portfolio: &PortfolioSnapshot, max_drawdown_pct: Decimal) -> Option<RiskVeto> {
    let floor = portfolio.initial_value * (dec!(1) - max_drawdown_pct / dec!(100));
    if portfolio.current_value < floor {
        return Some(RiskVeto::DrawdownExceeded {
            drawdown_pct: portfolio.drawdown_percent(),
            max_drawdown_pct,
        });
    }
    None
}
