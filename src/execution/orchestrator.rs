//! Funded execution across funding asset and financing protocol combinations

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use crate::{
    adapters::{
        FinancingAdapter, FundingOutcome, FundingRequest, SubmissionOutcome, TradeFill,
        TradeLedger, TradeOrder, TradeSubmitter,
    },
    config::Config,
    engine::EventBus,
    errors::{EngineError, EngineResult},
    network::{RetryPolicy, retry_counted},
    types::{
        AttemptContext, AttemptOutcome, CostStrategy, EngineEvent, ErrorEvent, ExecutionAttempt,
        OpportunitySignal, TradeRecord, TradeSide, TradeStatus,
    },
    utils::round_money,
};

/// Fill price worse than quoted by more than this (percent) is flagged.
pub const SLIPPAGE_WARNING_PCT: Decimal = dec!(0.5);

pub struct ExecutionOrchestrator {
    financing: Arc<dyn FinancingAdapter>,
    submitter: Arc<dyn TradeSubmitter>,
    ledger: Arc<dyn TradeLedger>,
    events: Arc<EventBus>,
    funding_assets: Vec<String>,
    financing_protocols: Vec<String>,
    retry_policy: RetryPolicy,
    call_timeout: Duration,
}

impl ExecutionOrchestrator {
    pub fn new(
        config: &Config,
        financing: Arc<dyn FinancingAdapter>,
        submitter: Arc<dyn TradeSubmitter>,
        ledger: Arc<dyn TradeLedger>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            financing,
            submitter,
            ledger,
            events,
            funding_assets: config.funding_assets.clone(),
            financing_protocols: config.financing_protocols.clone(),
            retry_policy: RetryPolicy::from_config(config),
            call_timeout: config.call_timeout(),
        }
    }

    /// Every (funding asset, financing protocol) pair, funding asset major.
    pub fn combinations(&self) -> Vec<(String, String)> {
        self.funding_assets
            .iter()
            .flat_map(|asset| {
                self.financing_protocols
                    .iter()
                    .map(move |protocol| (asset.clone(), protocol.clone()))
            })
            .collect()
    }

    /// Walks the combinations in order until one of them executes. The risk
    /// gate approved `amount` once, so a signal trades at most once; failed
    /// combinations before the first success are kept for reporting.
    ///
    /// Funding and submission are separate external calls and each gets the
    /// full retry budget, so one combination makes at most
    /// `2 * max_retries` calls.
    pub async fn attempt(
        &self,
        signal: &OpportunitySignal,
        strategy: &CostStrategy,
        amount: Decimal,
    ) -> Vec<ExecutionAttempt> {
        let combinations = self.combinations();
        info!(
            "🚀 Executing {} {} across up to {} funding combinations",
            amount, signal.asset, combinations.len()
        );

        let mut attempts = Vec::with_capacity(combinations.len());
        for (funding_asset, protocol) in combinations {
            let attempt = self
                .attempt_combination(signal, strategy, amount, &funding_asset, &protocol)
                .await;
            let executed = attempt.outcome.is_success();
            attempts.push(attempt);
            if executed {
                break;
            }
        }
        attempts
    }

    async fn attempt_combination(
        &self,
        signal: &OpportunitySignal,
        strategy: &CostStrategy,
        amount: Decimal,
        funding_asset: &str,
        protocol: &str,
    ) -> ExecutionAttempt {
        let (funding, funding_attempts) = self
            .fund(signal, amount, funding_asset, protocol)
            .await;

        let reference = match funding {
            Ok(reference) => reference,
            Err(e) => {
                self.publish_failure(signal, funding_asset, protocol, funding_attempts, &e);
                return ExecutionAttempt {
                    asset: signal.asset.clone(),
                    financing_protocol: protocol.to_string(),
                    retry_count: funding_attempts.saturating_sub(1),
                    outcome: AttemptOutcome::FundingFailed { reason: e.to_string() },
                };
            }
        };

        let order = TradeOrder {
            asset: signal.asset.clone(),
            side: TradeSide::Buy,
            venue: signal.direction.buy_venue(),
            amount,
            price: signal.buy_price(),
        };
        let (fill, submit_attempts) = self.submit(&order).await;
        let total_attempts = funding_attempts + submit_attempts;
        let retry_count = total_attempts.saturating_sub(2);

        let fill = match fill {
            Ok(fill) => fill,
            Err(e) => {
                self.publish_failure(signal, funding_asset, protocol, total_attempts, &e);
                return ExecutionAttempt {
                    asset: signal.asset.clone(),
                    financing_protocol: protocol.to_string(),
                    retry_count,
                    outcome: AttemptOutcome::SubmissionFailed {
                        funding_reference: reference,
                        reason: e.to_string(),
                    },
                };
            }
        };

        let record = build_trade_record(signal, strategy, &order, &fill, funding_asset, protocol, reference);
        if let Err(e) = self.ledger.append(&record).await {
            let err = EngineError::Ledger { source: e };
            warn!("Trade {} not persisted: {}", record.id, err);
            self.events.publish(EngineEvent::Warning(format!(
                "Trade {} executed but not recorded: {}",
                record.id, err
            )));
        }

        if record.status == TradeStatus::Completed {
            info!(
                "✅ {} trade {} via {}/{}: P&L {}",
                record.asset, record.id, funding_asset, protocol, record.profit_loss
            );
            self.events.publish(EngineEvent::TradeExecuted(record.clone()));
        } else {
            let err = EngineError::rejected(format!("{} order {}", order.venue, fill.order_id), "accepted but not filled");
            self.publish_failure(signal, funding_asset, protocol, total_attempts, &err);
        }

        ExecutionAttempt {
            asset: signal.asset.clone(),
            financing_protocol: protocol.to_string(),
            retry_count,
            outcome: AttemptOutcome::Executed(record),
        }
    }

    async fn fund(
        &self,
        signal: &OpportunitySignal,
        amount: Decimal,
        funding_asset: &str,
        protocol: &str,
    ) -> (EngineResult<String>, u32) {
        let deadline = Utc::now()
            + chrono::Duration::from_std(self.call_timeout).unwrap_or_else(|_| chrono::Duration::seconds(10));
        let request = FundingRequest {
            asset: funding_asset.to_string(),
            amount: round_money(amount * signal.buy_price()),
            protocol: protocol.to_string(),
            deadline,
        };
        let context = format!("{} funding via {}", funding_asset, protocol);

        let financing = &self.financing;
        let request = &request;
        let operation = context.as_str();
        retry_counted(
            move |_| async move {
                match financing.execute_funded_operation(request).await {
                    Ok(FundingOutcome::Funded { reference }) => Ok(reference),
                    Ok(FundingOutcome::Failed { error }) => Err(EngineError::rejected(operation, error)),
                    Err(e) => Err(EngineError::external(operation, e)),
                }
            },
            &self.retry_policy,
            &context,
        )
        .await
    }

    async fn submit(&self, order: &TradeOrder) -> (EngineResult<TradeFill>, u32) {
        let context = format!("{} {:?} on {}", order.asset, order.side, order.venue);

        let submitter = &self.submitter;
        let operation = context.as_str();
        retry_counted(
            move |_| async move {
                match submitter.submit(order).await {
                    Ok(SubmissionOutcome::Filled(fill)) => Ok(fill),
                    Ok(SubmissionOutcome::Failed { error }) => Err(EngineError::rejected(operation, error)),
                    Err(e) => Err(EngineError::external(operation, e)),
                }
            },
            &self.retry_policy,
            &context,
        )
        .await
    }

    fn publish_failure(
        &self,
        signal: &OpportunitySignal,
        funding_asset: &str,
        protocol: &str,
        attempts: u32,
        err: &EngineError,
    ) {
        error!(
            "❌ {} attempt via {}/{} failed after {} calls: {}",
            signal.asset, funding_asset, protocol, attempts, err
        );
        self.events.publish(EngineEvent::Error(ErrorEvent {
            message: err.to_string(),
            context: Some(AttemptContext {
                asset: signal.asset.clone(),
                funding_asset: funding_asset.to_string(),
                financing_protocol: protocol.to_string(),
                attempts,
            }),
        }));
    }
}

/// Builds the immutable record for a funded fill. P&L is realised against
/// the sell-side quote, net of the strategy cost and venue fee.
pub fn build_trade_record(
    signal: &OpportunitySignal,
    strategy: &CostStrategy,
    order: &TradeOrder,
    fill: &TradeFill,
    funding_asset: &str,
    protocol: &str,
    funding_reference: String,
) -> TradeRecord {
    let cost_paid = round_money(strategy.total_cost() + fill.fee);
    let gross = (signal.sell_price() - fill.effective_price) * fill.filled_amount;
    let profit_loss = round_money(gross - cost_paid);

    let mut warnings = Vec::new();
    if order.price > Decimal::ZERO {
        let slippage = (fill.effective_price - order.price) / order.price * dec!(100);
        if slippage > SLIPPAGE_WARNING_PCT {
            warnings.push(format!("Slippage {}% above quoted price", slippage.round_dp(4)));
        }
    }
    if fill.filled_amount > Decimal::ZERO && fill.filled_amount < order.amount {
        warnings.push(format!("Partial fill: {} of {}", fill.filled_amount, order.amount));
    }
    if profit_loss < Decimal::ZERO {
        warnings.push("Trade closed at a loss".to_string());
    }

    let status = if fill.filled_amount > Decimal::ZERO {
        TradeStatus::Completed
    } else {
        warnings.push("Order accepted but not filled".to_string());
        TradeStatus::Failed
    };

    TradeRecord {
        id: uuid::Uuid::new_v4().to_string(),
        asset: signal.asset.clone(),
        funding_asset: funding_asset.to_string(),
        financing_protocol: protocol.to_string(),
        funding_reference,
        side: order.side,
        venue: order.venue,
        amount: round_money(fill.filled_amount),
        price: round_money(order.price),
        effective_price: round_money(fill.effective_price),
        profit_loss,
        cost_paid,
        timestamp: Utc::now(),
        status,
        warnings,
    }
}
