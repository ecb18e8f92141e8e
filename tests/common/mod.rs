//! In-memory collaborators with injectable latency and failure

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use spread_arb_bot::{
    adapters::{
        ChannelPriceSource, FeeSampler, FinancingAdapter, FundingOutcome, FundingRequest,
        SubmissionOutcome, TradeFill, TradeOrder, TradeSubmitter,
    },
    storage::InMemoryTradeLedger,
    ArbitrageEngine, Collaborators, Config, EngineEvent, FeeSample,
};

/// Start and end of one collaborator call.
#[derive(Debug, Clone)]
pub struct CallSpan {
    pub label: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
pub struct MockFinancing {
    pub delay: Duration,
    pub failing_protocols: HashSet<String>,
    pub calls: Mutex<Vec<CallSpan>>,
}

impl MockFinancing {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn spans(&self) -> Vec<CallSpan> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FinancingAdapter for MockFinancing {
    async fn execute_funded_operation(&self, request: &FundingRequest) -> anyhow::Result<FundingOutcome> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.calls.lock().push(CallSpan {
            label: format!("{}/{}/{}", request.asset, request.protocol, request.amount),
            started,
            finished: Instant::now(),
        });

        if self.failing_protocols.contains(&request.protocol) {
            return Ok(FundingOutcome::Failed { error: format!("{} unavailable", request.protocol) });
        }
        Ok(FundingOutcome::Funded { reference: format!("loan-{}", request.protocol) })
    }
}

#[derive(Default)]
pub struct MockSubmitter {
    pub failing_assets: HashSet<String>,
    pub orders: Mutex<Vec<TradeOrder>>,
}

impl MockSubmitter {
    pub fn failing_for(asset: &str) -> Self {
        Self {
            failing_assets: HashSet::from([asset.to_string()]),
            ..Self::default()
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().len()
    }
}

#[async_trait]
impl TradeSubmitter for MockSubmitter {
    async fn submit(&self, order: &TradeOrder) -> anyhow::Result<SubmissionOutcome> {
        self.orders.lock().push(order.clone());
        if self.failing_assets.contains(&order.asset) {
            anyhow::bail!("{} venue rejected the order", order.asset);
        }
        Ok(SubmissionOutcome::Filled(TradeFill {
            order_id: format!("order-{}", self.orders.lock().len()),
            filled_amount: order.amount,
            effective_price: order.price,
            fee: dec!(0.1),
        }))
    }
}

/// Constant fees, so the optimizer sees a flat, stable market.
pub struct FlatFeeSampler {
    pub base_fee: Decimal,
    pub fail: bool,
}

impl Default for FlatFeeSampler {
    fn default() -> Self {
        Self { base_fee: dec!(0.000002), fail: false }
    }
}

#[async_trait]
impl FeeSampler for FlatFeeSampler {
    async fn sample(&self) -> anyhow::Result<FeeSample> {
        if self.fail {
            anyhow::bail!("fee oracle offline");
        }
        Ok(flat_sample(self.base_fee))
    }
}

pub fn flat_sample(base_fee: Decimal) -> FeeSample {
    FeeSample {
        timestamp: Utc::now(),
        base_fee,
        priority_fee: Decimal::ZERO,
        block_height: 1,
    }
}

/// Fast retries, two protocols and a single funding asset.
pub fn test_config() -> Config {
    Config {
        assets: vec!["ETH".to_string(), "BTC".to_string()],
        funding_assets: vec!["USDC".to_string()],
        financing_protocols: vec!["aave".to_string(), "balancer".to_string()],
        retry_delay_ms: 1,
        call_timeout_ms: 1_000,
        ..Config::default()
    }
}

pub struct Harness {
    pub engine: ArbitrageEngine,
    pub prices: ChannelPriceSource,
    pub financing: Arc<MockFinancing>,
    pub submitter: Arc<MockSubmitter>,
    pub ledger: InMemoryTradeLedger,
    pub events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl Harness {
    pub async fn new(config: Config, financing: MockFinancing, submitter: MockSubmitter) -> Self {
        Self::with_fees(config, financing, submitter, FlatFeeSampler::default(), true).await
    }

    pub async fn with_fees(
        config: Config,
        financing: MockFinancing,
        submitter: MockSubmitter,
        fees: FlatFeeSampler,
        warm_history: bool,
    ) -> Self {
        let prices = ChannelPriceSource::new();
        let financing = Arc::new(financing);
        let submitter = Arc::new(submitter);
        let ledger = InMemoryTradeLedger::new();
        let base_fee = fees.base_fee;
        let min_samples = config.min_history_samples;

        let engine = ArbitrageEngine::new(
            config,
            Collaborators {
                price_source: Arc::new(prices.clone()),
                financing: financing.clone(),
                submitter: submitter.clone(),
                ledger: Arc::new(ledger.clone()),
                fee_sampler: Arc::new(fees),
            },
        )
        .expect("valid test config");

        if warm_history {
            for _ in 0..min_samples {
                engine.record_fee_sample(flat_sample(base_fee)).await.unwrap();
            }
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.add_listener(move |event: &EngineEvent| sink.lock().push(event.clone()));

        Self { engine, prices, financing, submitter, ledger, events }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Polls until `count(kind) >= n` or the timeout passes.
    pub async fn wait_for(&self, kind: &str, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count(kind) >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.count(kind) >= n
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}
