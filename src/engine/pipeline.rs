//! Per-tick decision pipeline: detect, gate, strategize, execute

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use crate::{
    adapters::{FeeSampler, FinancingAdapter, TradeLedger, TradeSubmitter},
    arbitrage::OpportunityDetector,
    config::Config,
    cost::CostStrategyOptimizer,
    engine::EventBus,
    errors::{CircuitBreaker, EngineError, EngineResult},
    execution::{ExecutionOrchestrator, LaneHandler},
    network::{RetryPolicy, retry_with_backoff},
    risk::RiskGate,
    types::{
        AttemptOutcome, CandidateTrade, EngineEvent, ExecutionAttempt, ExecutionPhase, FeeSample,
        OpportunityEvent, PortfolioSnapshot, PriceObservation, TickOutcome,
    },
    utils::round_money,
};

/// Owns every pipeline component. Shared by the per-asset lanes, so all
/// state in here is either immutable or behind a lock.
pub struct TickProcessor {
    config: Arc<Config>,
    detector: OpportunityDetector,
    risk_gate: RiskGate,
    optimizer: CostStrategyOptimizer,
    orchestrator: ExecutionOrchestrator,
    fee_sampler: Arc<dyn FeeSampler>,
    circuit_breaker: CircuitBreaker,
    portfolio: RwLock<PortfolioSnapshot>,
    fee_retry: RetryPolicy,
    events: Arc<EventBus>,
}

impl TickProcessor {
    pub fn new(
        config: Arc<Config>,
        financing: Arc<dyn FinancingAdapter>,
        submitter: Arc<dyn TradeSubmitter>,
        ledger: Arc<dyn TradeLedger>,
        fee_sampler: Arc<dyn FeeSampler>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            detector: OpportunityDetector::new(config.profit_threshold_percent),
            risk_gate: RiskGate::new(&config),
            optimizer: CostStrategyOptimizer::new(&config),
            orchestrator: ExecutionOrchestrator::new(&config, financing, submitter, ledger, Arc::clone(&events)),
            fee_sampler,
            circuit_breaker: CircuitBreaker::new(config.max_consecutive_errors, config.circuit_breaker_cooldown_secs),
            portfolio: RwLock::new(PortfolioSnapshot::new(config.initial_portfolio_value)),
            fee_retry: RetryPolicy::from_config(&config),
            events,
            config,
        }
    }

    pub fn risk_gate(&self) -> &RiskGate {
        &self.risk_gate
    }

    pub fn optimizer(&self) -> &CostStrategyOptimizer {
        &self.optimizer
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub async fn portfolio(&self) -> PortfolioSnapshot {
        *self.portfolio.read().await
    }

    pub async fn set_portfolio_value(&self, value: Decimal) -> EngineResult<()> {
        if value < Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: "portfolio_value",
                reason: format!("must be non-negative, got {}", value),
            });
        }
        self.portfolio.write().await.current_value = round_money(value);
        Ok(())
    }

    pub async fn process_tick(&self, observation: PriceObservation) -> EngineResult<TickOutcome> {
        let Some(signal) = self.detector.detect(&observation) else {
            debug!(asset = %observation.asset, "Dropping tick with non-positive price");
            return Ok(TickOutcome::Dropped);
        };

        if !signal.qualifies {
            debug!(asset = %signal.asset, spread = %signal.spread_percent, "Spread below threshold");
            return Ok(TickOutcome::BelowThreshold { spread_percent: signal.spread_percent });
        }

        info!(
            "🎯 {} spread {:.4}% ({} DEX / {} CEX)",
            signal.asset, signal.spread_percent, signal.dex_price, signal.cex_price
        );
        self.events.publish(EngineEvent::Opportunity(OpportunityEvent {
            asset: signal.asset.clone(),
            dex_price: signal.dex_price,
            cex_price: signal.cex_price,
            spread_percent: signal.spread_percent,
        }));

        if !self.circuit_breaker.can_proceed().await {
            let err = EngineError::CircuitBreakerOpen {
                reason: format!("{} consecutive failed ticks", self.circuit_breaker.consecutive_errors().await),
                cooldown_remaining: self.circuit_breaker.cooldown_remaining().await,
            };
            warn!(asset = %signal.asset, "Skipping opportunity: {}", err);
            self.events.publish(EngineEvent::Warning(format!("Skipped {} opportunity: {}", signal.asset, err)));
            return Ok(TickOutcome::Vetoed { reason: err.to_string() });
        }

        // Idle -> RiskChecked
        let amount = self.config.trade_size;
        let candidate = CandidateTrade {
            asset: signal.asset.clone(),
            amount,
            dex_price: signal.dex_price,
            cex_price: signal.cex_price,
        };
        let portfolio = self.portfolio().await;
        let decision = match self.risk_gate.evaluate(&candidate, &portfolio) {
            Ok(decision) => decision,
            Err(e) => {
                error!(asset = %signal.asset, "Risk evaluation failed: {}", e);
                self.events.publish(EngineEvent::error(format!("Risk evaluation failed for {}: {}", signal.asset, e)));
                return Err(e);
            }
        };
        if let Some(reason) = decision.reason() {
            self.events.publish(EngineEvent::Warning(format!("Trade on {} vetoed: {}", signal.asset, reason)));
            return Ok(TickOutcome::Vetoed { reason });
        }
        debug!(asset = %signal.asset, phase = ?ExecutionPhase::RiskChecked, "Risk checks passed");

        // RiskChecked -> Strategized
        self.refresh_fee_history().await;
        let expected_profit = signal.expected_profit(amount);
        let strategy = match self.optimizer.strategize(expected_profit, self.config.complexity).await {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(asset = %signal.asset, "No viable cost strategy: {}", e);
                self.events.publish(EngineEvent::error(format!("Cost strategy rejected for {}: {}", signal.asset, e)));
                return Ok(TickOutcome::CostRejected { reason: e.to_string() });
            }
        };
        debug!(
            asset = %signal.asset,
            phase = ?ExecutionPhase::Strategized,
            total_cost = %strategy.total_cost(),
            wait_units = strategy.recommended_wait_units,
            "Cost strategy ready"
        );

        // Strategized -> Attempting -> terminal
        debug!(asset = %signal.asset, phase = ?ExecutionPhase::Attempting, "Starting funded attempts");
        let attempts = self.orchestrator.attempt(&signal, &strategy, amount).await;
        let phase = ExecutionPhase::from_attempts(&attempts);

        self.apply_realised_pnl(&attempts).await;
        self.update_breaker(phase, &signal.asset).await;

        info!(
            "🏁 {} tick finished {:?}: {}/{} combinations succeeded",
            signal.asset,
            phase,
            attempts.iter().filter(|a| a.outcome.is_success()).count(),
            attempts.len()
        );
        Ok(TickOutcome::Executed { phase, attempts })
    }

    /// Pulls one fee sample into the rolling history. Failure leaves the
    /// history as it is; the optimizer decides whether that is enough.
    async fn refresh_fee_history(&self) {
        let sampler = &self.fee_sampler;
        let sample = retry_with_backoff(
            move |_| async move {
                sampler
                    .sample()
                    .await
                    .map_err(|e| EngineError::external("fee sampling", e))
            },
            &self.fee_retry,
            "fee sampling",
        )
        .await;

        let recorded = match sample {
            Ok(sample) => self.optimizer.record_sample(sample).await,
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            warn!("Fee history not updated: {}", e);
            self.events.publish(EngineEvent::Warning(format!("Fee sample unavailable: {}", e)));
        }
    }

    pub async fn record_fee_sample(&self, sample: FeeSample) -> EngineResult<()> {
        self.optimizer.record_sample(sample).await
    }

    async fn apply_realised_pnl(&self, attempts: &[ExecutionAttempt]) {
        let realised: Decimal = attempts
            .iter()
            .filter(|a| a.outcome.is_success())
            .filter_map(|a| match &a.outcome {
                AttemptOutcome::Executed(record) => Some(record.profit_loss),
                _ => None,
            })
            .sum();
        if realised.is_zero() {
            return;
        }

        let mut portfolio = self.portfolio.write().await;
        portfolio.current_value = round_money(portfolio.current_value + realised);
        debug!(realised = %realised, value = %portfolio.current_value, "Portfolio updated");
    }

    async fn update_breaker(&self, phase: ExecutionPhase, asset: &str) {
        if phase == ExecutionPhase::FullyFailed {
            if self.circuit_breaker.record_error().await {
                self.events.publish(EngineEvent::Warning(format!(
                    "Circuit breaker opened after {} consecutive failed ticks (last: {})",
                    self.circuit_breaker.consecutive_errors().await,
                    asset
                )));
            }
        } else {
            self.circuit_breaker.record_success().await;
        }
    }
}

#[async_trait]
impl LaneHandler<PriceObservation> for TickProcessor {
    async fn handle(&self, observation: PriceObservation) {
        let asset = observation.asset.clone();
        match self.process_tick(observation).await {
            Ok(outcome) => debug!(asset = %asset, ?outcome, "Tick processed"),
            Err(e) => error!(asset = %asset, "Tick failed: {}", e),
        }
    }
}
