//! Trade submission adapter contract

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use crate::types::{TradeSide, Venue};

#[derive(Debug, Clone, Serialize)]
pub struct TradeOrder {
    pub asset: String,
    pub side: TradeSide,
    pub venue: Venue,
    pub amount: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeFill {
    pub order_id: String,
    pub filled_amount: Decimal,
    pub effective_price: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Filled(TradeFill),
    Failed { error: String },
}

#[async_trait]
pub trait TradeSubmitter: Send + Sync {
    async fn submit(&self, order: &TradeOrder) -> anyhow::Result<SubmissionOutcome>;
}
