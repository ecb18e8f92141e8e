//! Risk gate: ordered policy checks in front of every execution attempt

use rust_decimal::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use crate::{
    config::Config,
    errors::{EngineError, EngineResult},
    risk::{check_drawdown, check_position_size, check_price_sanity},
    types::{CandidateTrade, PortfolioSnapshot, RiskDecision, RiskVeto},
};

pub struct RiskGate {
    max_trade_size: Decimal,
    manipulation_threshold_percent: Decimal,
    max_drawdown_percent: Decimal,
    live_capital: bool,
    emergency_shutdown: AtomicBool,
}

impl RiskGate {
    pub fn new(config: &Config) -> Self {
        Self {
            max_trade_size: config.max_trade_size,
            manipulation_threshold_percent: config.manipulation_threshold_percent,
            max_drawdown_percent: config.max_drawdown_percent,
            live_capital: config.live_capital,
            emergency_shutdown: AtomicBool::new(config.emergency_shutdown),
        }
    }

    pub fn set_emergency_shutdown(&self, active: bool) {
        let previous = self.emergency_shutdown.swap(active, Ordering::SeqCst);
        if previous != active {
            warn!("🚨 Emergency shutdown {}", if active { "ENGAGED" } else { "released" });
        }
    }

    pub fn emergency_shutdown_active(&self) -> bool {
        self.emergency_shutdown.load(Ordering::SeqCst)
    }

    /// Policy violations come back as a rejected decision. Only malformed
    /// input is an error.
    pub fn evaluate(&self, trade: &CandidateTrade, portfolio: &PortfolioSnapshot) -> EngineResult<RiskDecision> {
        validate_candidate(trade)?;

        if self.emergency_shutdown_active() {
            return Ok(RiskDecision::reject(RiskVeto::EmergencyShutdown));
        }

        if let Some(veto) = check_price_sanity(trade.dex_price, trade.cex_price, self.manipulation_threshold_percent) {
            return Ok(reject(trade, veto));
        }

        if let Some(veto) = check_position_size(trade.amount, self.max_trade_size) {
            return Ok(reject(trade, veto));
        }

        if self.live_capital {
            if portfolio.initial_value <= Decimal::ZERO {
                return Err(EngineError::InvalidInput {
                    field: "portfolio.initial_value",
                    reason: format!("must be positive, got {}", portfolio.initial_value),
                });
            }
            if let Some(veto) = check_drawdown(portfolio, self.max_drawdown_percent) {
                return Ok(reject(trade, veto));
            }
        }

        debug!(asset = %trade.asset, amount = %trade.amount, "Risk checks passed");
        Ok(RiskDecision::approve())
    }
}

fn reject(trade: &CandidateTrade, veto: RiskVeto) -> RiskDecision {
    debug!(asset = %trade.asset, "Risk veto: {}", veto);
    RiskDecision::reject(veto)
}

fn validate_candidate(trade: &CandidateTrade) -> EngineResult<()> {
    if trade.asset.trim().is_empty() {
        return Err(EngineError::InvalidInput {
            field: "asset",
            reason: "asset symbol is empty".to_string(),
        });
    }
    if trade.amount <= Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: "amount",
            reason: format!("trade amount must be positive, got {}", trade.amount),
        });
    }
    Ok(())
}
