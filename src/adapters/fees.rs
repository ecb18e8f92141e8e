//! Fee sampling collaborator contract

use async_trait::async_trait;
use crate::types::FeeSample;

/// Supplies the latest fee observation, typically one per block.
#[async_trait]
pub trait FeeSampler: Send + Sync {
    async fn sample(&self) -> anyhow::Result<FeeSample>;
}
