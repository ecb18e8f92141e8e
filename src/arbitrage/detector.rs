//! Opportunity detection from a pair of venue prices

use rust_decimal::prelude::*;
use tracing::debug;
use crate::{
    types::{OpportunitySignal, PriceObservation, TradeDirection},
    utils::spread_percent,
};

#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    profit_threshold_percent: Decimal,
}

impl OpportunityDetector {
    pub fn new(profit_threshold_percent: Decimal) -> Self {
        Self { profit_threshold_percent }
    }

    /// Returns `None` for an observation with a non-positive price or a
    /// spread too extreme to represent; such a tick means "no opportunity"
    /// rather than an error.
    pub fn detect(&self, observation: &PriceObservation) -> Option<OpportunitySignal> {
        let dex_price = observation.dex_price;
        let cex_price = observation.cex_price;

        let Some(spread_pct) = spread_percent(dex_price, cex_price) else {
            debug!(
                asset = %observation.asset,
                "Ignoring observation with unusable prices: DEX {} / CEX {}",
                dex_price, cex_price
            );
            return None;
        };

        let direction = if dex_price < cex_price {
            TradeDirection::BuyDexSellCex
        } else {
            TradeDirection::BuyCexSellDex
        };

        Some(OpportunitySignal {
            asset: observation.asset.clone(),
            dex_price,
            cex_price,
            spread_absolute: (dex_price - cex_price).abs(),
            spread_percent: spread_pct,
            direction,
            qualifies: spread_pct >= self.profit_threshold_percent,
            observed_at: observation.observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn observe(dex: Decimal, cex: Decimal) -> PriceObservation {
        PriceObservation::new("ETH", dex, cex)
    }

    #[test]
    fn test_one_percent_spread_qualifies() {
        let detector = OpportunityDetector::new(dec!(1.0));
        let signal = detector.detect(&observe(dec!(1000), dec!(1010))).unwrap();
        assert_eq!(signal.spread_percent, dec!(1));
        assert_eq!(signal.spread_absolute, dec!(10));
        assert_eq!(signal.direction, TradeDirection::BuyDexSellCex);
        assert!(signal.qualifies);
        assert_eq!(signal.buy_price(), dec!(1000));
        assert_eq!(signal.sell_price(), dec!(1010));
        assert_eq!(signal.expected_profit(dec!(2)), dec!(20));
    }

    #[test]
    fn test_small_spread_does_not_qualify() {
        let detector = OpportunityDetector::new(dec!(1.0));
        let signal = detector.detect(&observe(dec!(1000), dec!(1003))).unwrap();
        assert_eq!(signal.spread_percent, dec!(0.3));
        assert!(!signal.qualifies);
    }

    #[test]
    fn test_cheaper_cex_reverses_direction() {
        let detector = OpportunityDetector::new(dec!(1.0));
        let signal = detector.detect(&observe(dec!(1020), dec!(1000))).unwrap();
        assert_eq!(signal.direction, TradeDirection::BuyCexSellDex);
        assert_eq!(signal.direction.buy_venue(), crate::types::Venue::Cex);
    }

    #[test]
    fn test_non_positive_prices_are_rejected_quietly() {
        let detector = OpportunityDetector::new(dec!(1.0));
        assert!(detector.detect(&observe(dec!(0), dec!(1010))).is_none());
        assert!(detector.detect(&observe(dec!(1000), dec!(-5))).is_none());
    }

    #[test]
    fn test_unrepresentable_spread_is_dropped() {
        let detector = OpportunityDetector::new(dec!(1.0));
        let tiny = Decimal::new(1, 28);
        assert!(detector.detect(&observe(dec!(1), tiny)).is_none());
        assert!(detector.detect(&observe(tiny, Decimal::MAX)).is_none());
    }

    proptest! {
        #[test]
        fn prop_qualifies_iff_spread_meets_threshold(
            dex in 1u32..1_000_000,
            cex in 1u32..1_000_000,
            threshold_bps in 1u32..2_000,
        ) {
            let threshold = Decimal::from(threshold_bps) / dec!(100);
            let detector = OpportunityDetector::new(threshold);
            let signal = detector.detect(&observe(Decimal::from(dex), Decimal::from(cex))).unwrap();
            prop_assert!(signal.spread_percent >= Decimal::ZERO);
            prop_assert_eq!(signal.qualifies, signal.spread_percent >= threshold);
        }

        #[test]
        fn prop_detection_is_symmetric_in_spread(a in 1u32..100_000, b in 1u32..100_000) {
            let detector = OpportunityDetector::new(dec!(1));
            let forward = detector.detect(&observe(Decimal::from(a), Decimal::from(b))).unwrap();
            let reverse = detector.detect(&observe(Decimal::from(b), Decimal::from(a))).unwrap();
            prop_assert_eq!(forward.spread_percent, reverse.spread_percent);
            prop_assert_eq!(forward.qualifies, reverse.qualifies);
        }
    }
}
