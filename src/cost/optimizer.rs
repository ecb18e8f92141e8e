//! Cost strategy optimizer: fee and priority parameters bounded by expected profit

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::{
    config::Config,
    cost::{compute_statistics, FeeHistory},
    errors::{EngineError, EngineResult},
    types::{Complexity, CostStrategy, FeeSample, FeeStatistics, FeeTrend},
    utils::round_fee_up,
};

pub const INCREASING_TREND_BUMP: Decimal = dec!(1.10);
/// Upper bound on the volatility scale-up of the base fee (std-dev / median).
pub const MAX_VOLATILITY_SCALE: Decimal = dec!(0.5);
/// Share of expected profit offered as priority, spread across all units.
pub const PRIORITY_PROFIT_SHARE: Decimal = dec!(0.005);
pub const CONGESTION_RATIO: Decimal = dec!(2);
pub const CONGESTION_BUMP: Decimal = dec!(1.5);

#[derive(Debug, Clone)]
pub struct StrategyLimits {
    pub min_profit_margin: Decimal,
    pub max_priority_fee: Decimal,
    pub base_unit_limit: u64,
    pub min_history_samples: usize,
}

impl StrategyLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_profit_margin: config.min_profit_margin,
            max_priority_fee: config.max_priority_fee,
            base_unit_limit: config.base_unit_limit,
            min_history_samples: config.min_history_samples,
        }
    }
}

pub struct CostStrategyOptimizer {
    history: Arc<RwLock<FeeHistory>>,
    limits: StrategyLimits,
}

impl CostStrategyOptimizer {
    pub fn new(config: &Config) -> Self {
        Self {
            history: Arc::new(RwLock::new(FeeHistory::new(config.history_window_size))),
            limits: StrategyLimits::from_config(config),
        }
    }

    pub async fn record_sample(&self, sample: FeeSample) -> EngineResult<()> {
        if sample.base_fee < Decimal::ZERO || sample.priority_fee < Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: "fee_sample",
                reason: format!(
                    "fees must be non-negative, got base {} / priority {}",
                    sample.base_fee, sample.priority_fee
                ),
            });
        }
        self.history.write().await.push(sample);
        Ok(())
    }

    pub async fn sample_count(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn statistics(&self) -> Option<FeeStatistics> {
        compute_statistics(&*self.history.read().await)
    }

    /// Fails closed: too little history or a strategy costing more than
    /// `expected_profit * min_profit_margin` is an error, never a cheap guess.
    pub async fn strategize(&self, expected_profit: Decimal, complexity: Complexity) -> EngineResult<CostStrategy> {
        let stats = {
            let history = self.history.read().await;
            if history.len() < self.limits.min_history_samples {
                return Err(EngineError::InsufficientFeeHistory {
                    samples: history.len(),
                    required: self.limits.min_history_samples,
                });
            }
            compute_statistics(&history)
        };

        let stats = stats.ok_or(EngineError::InsufficientFeeHistory {
            samples: 0,
            required: self.limits.min_history_samples,
        })?;

        build_strategy(&stats, expected_profit, complexity, &self.limits)
    }
}

pub fn build_strategy(
    stats: &FeeStatistics,
    expected_profit: Decimal,
    complexity: Complexity,
    limits: &StrategyLimits,
) -> EngineResult<CostStrategy> {
    if expected_profit <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "expected_profit",
            reason: format!("must be positive, got {}", expected_profit),
        });
    }

    let unit_limit = limits.base_unit_limit * complexity.unit_multiplier();

    // Base fee: median, bumped on a rising trend, scaled by relative volatility
    let mut base_fee = stats.median;
    if stats.trend == FeeTrend::Increasing {
        base_fee *= INCREASING_TREND_BUMP;
    }
    if stats.median > Decimal::ZERO {
        let relative_volatility = (stats.volatility / stats.median).min(MAX_VOLATILITY_SCALE);
        base_fee *= dec!(1) + relative_volatility;
    }
    let base_fee = round_fee_up(base_fee);

    // Priority fee: tenth of median plus a profit share, bumped under congestion
    let profit_component = expected_profit * PRIORITY_PROFIT_SHARE / Decimal::from(unit_limit);
    let mut priority_fee = stats.median / dec!(10) + profit_component;
    let congested = stats.p90 > stats.median * CONGESTION_RATIO;
    if congested {
        priority_fee *= CONGESTION_BUMP;
    }
    let priority_fee = round_fee_up(priority_fee.min(limits.max_priority_fee));

    let strategy = CostStrategy {
        base_fee,
        priority_fee,
        unit_limit,
        recommended_wait_units: match stats.trend {
            FeeTrend::Decreasing => 1,
            FeeTrend::Stable => 2,
            FeeTrend::Increasing => 3,
        },
    };

    let total_cost = strategy.total_cost();
    let max_cost = expected_profit * limits.min_profit_margin;
    if total_cost > max_cost {
        warn!(
            "Cost strategy rejected: total {} exceeds {} ({} of expected profit {})",
            total_cost, max_cost, limits.min_profit_margin, expected_profit
        );
        return Err(EngineError::CostBoundExceeded { total_cost, max_cost });
    }

    debug!(
        base_fee = %strategy.base_fee,
        priority_fee = %strategy.priority_fee,
        unit_limit = strategy.unit_limit,
        trend = ?stats.trend,
        congested,
        "Cost strategy computed"
    );

    Ok(strategy)
}
