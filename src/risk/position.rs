//! Position size cap

use rust_decimal::prelude::*;
use crate::types::RiskVeto;

pub fn check_position_size(amount: Decimal, max_trade_size: Decimal) -> Option<RiskVeto> {
    if amount > max_trade_size {
        return Some(RiskVeto::TradeSizeExceeded { amount, max_trade_size });
    }
    None
}
