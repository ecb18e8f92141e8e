//! Summary statistics over the fee window

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::{
    cost::FeeHistory,
    types::{FeeStatistics, FeeTrend},
};

/// Relative change between first and last quarter that counts as a trend.
pub const TREND_THRESHOLD: Decimal = dec!(0.10);

pub fn median(sorted: &[Decimal]) -> Decimal {
    if sorted.is_empty() {
        return Decimal::ZERO;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / dec!(2)
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[Decimal], pct: u32) -> Decimal {
    if sorted.is_empty() {
        return Decimal::ZERO;
    }
    let rank = (pct.min(100) as usize * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1)]
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// Compares the average of the first quarter against the last quarter.
pub fn classify_trend(values: &[Decimal]) -> FeeTrend {
    if values.len() < 2 {
        return FeeTrend::Stable;
    }
    let quarter = (values.len() / 4).max(1);
    let first = mean(&values[..quarter]);
    let last = mean(&values[values.len() - quarter..]);

    if first.is_zero() {
        return if last > Decimal::ZERO { FeeTrend::Increasing } else { FeeTrend::Stable };
    }

    let change = (last - first) / first;
    if change > TREND_THRESHOLD {
        FeeTrend::Increasing
    } else if change < -TREND_THRESHOLD {
        FeeTrend::Decreasing
    } else {
        FeeTrend::Stable
    }
}

pub fn population_std_dev(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    // Variance stays in fixed point; only the square root goes through f64.
    let mean = mean(values);
    let variance = values.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>()
        / Decimal::from(values.len());
    if variance.is_zero() {
        return Decimal::ZERO;
    }

    variance
        .to_f64()
        .and_then(|v| Decimal::from_f64(v.sqrt()))
        .unwrap_or(Decimal::ZERO)
}

/// `None` for an empty window.
pub fn compute_statistics(history: &FeeHistory) -> Option<FeeStatistics> {
    if history.is_empty() {
        return None;
    }

    let in_order = history.base_fees();
    let mut sorted = in_order.clone();
    sorted.sort();

    Some(FeeStatistics {
        sample_count: in_order.len(),
        median: median(&sorted),
        p90: percentile(&sorted, 90),
        trend: classify_trend(&in_order),
        volatility: population_std_dev(&in_order),
    })
}
