//! Trade ledger contract

use async_trait::async_trait;
use crate::types::TradeRecord;

/// Append-only sink for executed trades. The engine never reads it back.
#[async_trait]
pub trait TradeLedger: Send + Sync {
    async fn append(&self, record: &TradeRecord) -> anyhow::Result<()>;
}
