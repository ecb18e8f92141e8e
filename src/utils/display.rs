//! Display and printing utilities

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{error, info, warn};
use crate::types::{EngineEvent, ErrorEvent, HealthStatus, OpportunityEvent, TradeRecord, TradeStatus};

/// Running totals built from engine events.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started_at: Instant,
    pub opportunities: u64,
    pub trades: u64,
    pub failed_trades: u64,
    pub warnings: u64,
    pub errors: u64,
    pub realised_pnl: Decimal,
    pub costs_paid: Decimal,
    pub opportunities_by_asset: HashMap<String, u64>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            opportunities: 0,
            trades: 0,
            failed_trades: 0,
            warnings: 0,
            errors: 0,
            realised_pnl: Decimal::ZERO,
            costs_paid: Decimal::ZERO,
            opportunities_by_asset: HashMap::new(),
        }
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Opportunity(opportunity) => {
                self.opportunities += 1;
                *self.opportunities_by_asset.entry(opportunity.asset.clone()).or_insert(0) += 1;
            }
            EngineEvent::TradeExecuted(record) => {
                self.trades += 1;
                self.realised_pnl += record.profit_loss;
                self.costs_paid += record.cost_paid;
            }
            EngineEvent::Warning(_) => self.warnings += 1,
            EngineEvent::Error(ErrorEvent { context, .. }) => {
                self.errors += 1;
                if context.is_some() {
                    self.failed_trades += 1;
                }
            }
            EngineEvent::Started | EngineEvent::Stopped => {}
        }
    }

    /// Share of attempted combinations that produced a trade, in percent.
    pub fn trade_success_rate(&self) -> f64 {
        let attempted = self.trades + self.failed_trades;
        if attempted == 0 {
            return 0.0;
        }
        self.trades as f64 / attempted as f64 * 100.0
    }
}

pub fn print_session_stats(stats: &SessionStats, health: &HealthStatus) {
    let runtime = stats.started_at.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 OPPORTUNITIES:");
    info!("     Qualifying spreads: {}", stats.opportunities);
    let mut by_asset: Vec<_> = stats.opportunities_by_asset.iter().collect();
    by_asset.sort();
    for (asset, count) in by_asset {
        info!("       {}: {}", asset, count);
    }

    info!("   🚀 TRADE EXECUTION:");
    info!("     Trades executed: {}", stats.trades);
    info!("     Failed combinations: {}", stats.failed_trades);
    info!("     Success rate: {:.1}%", stats.trade_success_rate());
    info!("     Realised P&L: ${:.2}", stats.realised_pnl);
    info!("     Costs paid: ${:.4}", stats.costs_paid);

    info!("   ⚙️  SYSTEM:");
    info!("     Engine: {:?}, uptime {}s", health.state, health.uptime_seconds);
    info!(
        "     Circuit breaker: {} ({} consecutive errors)",
        if health.circuit_breaker_active { "OPEN" } else { "CLOSED" },
        health.consecutive_errors
    );
    info!("     Emergency shutdown: {}", if health.emergency_shutdown { "ON" } else { "off" });
    info!("     Active lanes: {}, fee samples: {}", health.active_lanes, health.fee_samples);
    info!("     Warnings: {}, errors: {}", stats.warnings, stats.errors);
    info!("");
}

pub fn print_opportunity(opportunity: &OpportunityEvent) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY: {}", opportunity.asset);
    warn!("   DEX Price: ${:.4}", opportunity.dex_price);
    warn!("   CEX Price: ${:.4}", opportunity.cex_price);
    warn!("   Spread: {:.3}%", opportunity.spread_percent);
}

pub fn print_trade_record(record: &TradeRecord) {
    match record.status {
        TradeStatus::Completed => {
            warn!("\n✅ TRADE EXECUTED #{}", record.id);
            warn!("📍 {} {:?} on {}", record.asset, record.side, record.venue);
            warn!("💰 Execution Details:");
            warn!("   Funding: {} via {} ({})", record.funding_asset, record.financing_protocol, record.funding_reference);
            warn!("   Amount: {}", record.amount);
            warn!("   Quoted Price: ${:.4}", record.price);
            warn!("   Effective Price: ${:.4}", record.effective_price);
            warn!("   Cost Paid: ${:.4}", record.cost_paid);
            warn!("   P&L: ${:.2}", record.profit_loss);
            for warning in &record.warnings {
                warn!("   ⚠️  {}", warning);
            }
        }
        TradeStatus::Failed => {
            error!("\n❌ TRADE FAILED #{}", record.id);
            error!("   {}", record.warnings.join("; "));
        }
    }
}
