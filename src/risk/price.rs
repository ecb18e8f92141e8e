//! Price sanity check

use rust_decimal::prelude::*;
use crate::{types::RiskVeto, utils::spread_percent};

/// Vetoes non-positive prices and venue divergence above `threshold_pct`,
/// which suggests one venue is being manipulated.
pub fn check_price_sanity(dex_price: Decimal, cex_price: Decimal, threshold_pct: Decimal) -> Option<RiskVeto> {
    let Some(divergence_pct) = spread_percent(dex_price, cex_price) else {
        return Some(RiskVeto::InvalidPrice { dex_price, cex_price });
    };

    if divergence_pct > threshold_pct {
        return Some(RiskVeto::PriceManipulation {
            divergence_pct,
            threshold_pct,
        });
    }

    None
}
