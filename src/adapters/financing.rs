//! Financing adapter contract (funded-execution primitive)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FundingRequest {
    pub asset: String,
    pub amount: Decimal,
    pub protocol: String,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FundingOutcome {
    Funded { reference: String },
    Failed { error: String },
}

/// Provides short-lived funding (e.g. a flash loan) so the engine does not
/// hold capital upfront.
#[async_trait]
pub trait FinancingAdapter: Send + Sync {
    async fn execute_funded_operation(&self, request: &FundingRequest) -> anyhow::Result<FundingOutcome>;
}
