//! Fixed-point helpers for prices, fees and P&L

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Decimal places kept for prices, amounts and P&L.
pub const MONEY_DP: u32 = 8;
/// Decimal places kept for per-unit fees.
pub const FEE_DP: u32 = 12;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

/// Fee estimates never round down.
pub fn round_fee_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FEE_DP, RoundingStrategy::AwayFromZero)
}

/// `|a - b| / min(a, b) * 100`, or `None` when either price is non-positive
/// or the result does not fit in a `Decimal`.
pub fn spread_percent(a: Decimal, b: Decimal) -> Option<Decimal> {
    if a <= dec!(0) || b <= dec!(0) {
        return None;
    }
    a.checked_sub(b)?
        .abs()
        .checked_div(a.min(b))?
        .checked_mul(dec!(100))
}
