//! Trade execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::Venue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeStatus {
    Completed,
    Failed,
}

/// Immutable record of a funded trade, appended to the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub id: String,
    pub asset: String,
    pub funding_asset: String,
    pub financing_protocol: String,
    pub funding_reference: String,
    pub side: TradeSide,
    pub venue: Venue,
    pub amount: Decimal,
    pub price: Decimal,
    pub effective_price: Decimal,
    pub profit_loss: Decimal,
    pub cost_paid: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttemptOutcome {
    Executed(TradeRecord),
    FundingFailed { reason: String },
    SubmissionFailed { funding_reference: String, reason: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Executed(record) if record.status == TradeStatus::Completed)
    }
}

/// One (funding asset, financing protocol) combination for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionAttempt {
    pub asset: String,
    pub financing_protocol: String,
    pub retry_count: u32,
    pub outcome: AttemptOutcome,
}

/// Where a tick ended up in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionPhase {
    Idle,
    RiskChecked,
    Strategized,
    Attempting,
    Completed,
    PartiallyFailed,
    FullyFailed,
}

impl ExecutionPhase {
    pub fn from_attempts(attempts: &[ExecutionAttempt]) -> Self {
        let succeeded = attempts.iter().filter(|a| a.outcome.is_success()).count();
        match succeeded {
            0 => ExecutionPhase::FullyFailed,
            n if n == attempts.len() => ExecutionPhase::Completed,
            _ => ExecutionPhase::PartiallyFailed,
        }
    }
}

/// Result of running one observation through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub enum TickOutcome {
    /// Invalid observation, dropped without an event.
    Dropped,
    BelowThreshold { spread_percent: Decimal },
    Vetoed { reason: String },
    CostRejected { reason: String },
    Executed { phase: ExecutionPhase, attempts: Vec<ExecutionAttempt> },
}
