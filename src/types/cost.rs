//! Fee history and cost strategy types
//!
//! Fees are quoted in the same currency as expected profit, per execution
//! unit, so `(base_fee + priority_fee) * unit_limit` is directly comparable
//! to profit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSample {
    pub timestamp: DateTime<Utc>,
    pub base_fee: Decimal,
    pub priority_fee: Decimal,
    pub block_height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn unit_multiplier(&self) -> u64 {
        match self {
            Complexity::Low => 1,
            Complexity::Medium => 2,
            Complexity::High => 3,
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Complexity::Low),
            "medium" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            other => Err(format!("unknown complexity '{}'", other)),
        }
    }
}

/// Summary statistics over the rolling fee window (base fees).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeStatistics {
    pub sample_count: usize,
    pub median: Decimal,
    pub p90: Decimal,
    pub trend: FeeTrend,
    pub volatility: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostStrategy {
    pub base_fee: Decimal,
    pub priority_fee: Decimal,
    pub unit_limit: u64,
    pub recommended_wait_units: u32,
}

impl CostStrategy {
    pub fn total_cost(&self) -> Decimal {
        (self.base_fee + self.priority_fee) * Decimal::from(self.unit_limit)
    }
}
