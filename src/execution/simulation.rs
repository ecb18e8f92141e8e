//! Paper-trading collaborators for running without live venues

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;
use crate::{
    adapters::{
        FeeSampler, FinancingAdapter, FundingOutcome, FundingRequest, SubmissionOutcome,
        TradeFill, TradeOrder, TradeSubmitter,
    },
    types::{FeeSample, TradeSide},
};

fn succeeds(success_rate: f64) -> bool {
    rand::random::<f64>() < success_rate
}

/// Grants funding with a fixed probability after a simulated round trip.
#[derive(Debug, Clone)]
pub struct SimulatedFinancingAdapter {
    pub success_rate: f64,
    pub latency: Duration,
}

impl Default for SimulatedFinancingAdapter {
    fn default() -> Self {
        Self {
            success_rate: 0.9,
            latency: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl FinancingAdapter for SimulatedFinancingAdapter {
    async fn execute_funded_operation(&self, request: &FundingRequest) -> anyhow::Result<FundingOutcome> {
        tokio::time::sleep(self.latency).await;

        if Utc::now() > request.deadline {
            return Ok(FundingOutcome::Failed {
                error: "Funding deadline passed".to_string(),
            });
        }

        if succeeds(self.success_rate) {
            let reference = format!("{}-{}", request.protocol, uuid::Uuid::new_v4().simple());
            info!("🎭 Simulated funding of {} {} via {}", request.amount, request.asset, request.protocol);
            Ok(FundingOutcome::Funded { reference })
        } else {
            Ok(FundingOutcome::Failed {
                error: format!("Simulated {} liquidity shortfall", request.protocol),
            })
        }
    }
}

/// Fills orders with slippage against the taker and a proportional fee.
#[derive(Debug, Clone)]
pub struct SimulatedTradeSubmitter {
    pub success_rate: f64,
    pub latency: Duration,
    pub max_slippage_bps: u32,
    pub fee_bps: u32,
}

impl Default for SimulatedTradeSubmitter {
    fn default() -> Self {
        Self {
            success_rate: 0.95,
            latency: Duration::from_millis(100),
            max_slippage_bps: 25,
            fee_bps: 10,
        }
    }
}

#[async_trait]
impl TradeSubmitter for SimulatedTradeSubmitter {
    async fn submit(&self, order: &TradeOrder) -> anyhow::Result<SubmissionOutcome> {
        tokio::time::sleep(self.latency).await;

        if !succeeds(self.success_rate) {
            return Ok(SubmissionOutcome::Failed {
                error: format!("Simulated rejection on {}", order.venue),
            });
        }

        let slippage_bps = if self.max_slippage_bps == 0 {
            0
        } else {
            rand::random_range(0..=self.max_slippage_bps)
        };
        let slippage = Decimal::from(slippage_bps) / dec!(10000);
        let effective_price = match order.side {
            TradeSide::Buy => order.price * (dec!(1) + slippage),
            TradeSide::Sell => order.price * (dec!(1) - slippage),
        };
        let fee = effective_price * order.amount * Decimal::from(self.fee_bps) / dec!(10000);

        info!("🎭 Simulated fill: {} {} @ {} ({}bps slippage)", order.amount, order.asset, effective_price, slippage_bps);
        Ok(SubmissionOutcome::Filled(TradeFill {
            order_id: uuid::Uuid::new_v4().to_string(),
            filled_amount: order.amount,
            effective_price,
            fee,
        }))
    }
}

/// Emits fees jittered around a base level, one simulated block per sample.
#[derive(Debug)]
pub struct SimulatedFeeSampler {
    pub base_fee: Decimal,
    pub priority_fee: Decimal,
    /// Maximum relative deviation from `base_fee`, e.g. 0.2 for ±20%.
    pub jitter: f64,
    block_height: AtomicU64,
}

impl SimulatedFeeSampler {
    pub fn new(base_fee: Decimal, priority_fee: Decimal, jitter: f64) -> Self {
        Self {
            base_fee,
            priority_fee,
            jitter: jitter.abs(),
            block_height: AtomicU64::new(1),
        }
    }
}

impl Default for SimulatedFeeSampler {
    fn default() -> Self {
        Self::new(dec!(0.000002), dec!(0.0000005), 0.2)
    }
}

#[async_trait]
impl FeeSampler for SimulatedFeeSampler {
    async fn sample(&self) -> anyhow::Result<FeeSample> {
        let deviation = (rand::random::<f64>() * 2.0 - 1.0) * self.jitter;
        let factor = Decimal::from_f64(1.0 + deviation).unwrap_or(Decimal::ONE);

        Ok(FeeSample {
            timestamp: Utc::now(),
            base_fee: (self.base_fee * factor).max(Decimal::ZERO),
            priority_fee: self.priority_fee,
            block_height: self.block_height.fetch_add(1, Ordering::Relaxed),
        })
    }
}
