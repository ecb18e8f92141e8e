//! Engine lifecycle: start/stop, tick admission and runtime controls

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::{
    adapters::{FeeSampler, FinancingAdapter, PriceSource, Subscription, TradeLedger, TradeSubmitter},
    config::Config,
    engine::{EventBus, EventListener, ListenerId, TickProcessor},
    errors::{EngineError, EngineResult},
    execution::{LaneHandler, TradeQueue},
    types::{EngineEvent, EngineState, FeeSample, HealthStatus, PortfolioSnapshot, PriceObservation},
};

/// External systems the engine talks to. All are injected; the engine
/// owns none of their configuration.
#[derive(Clone)]
pub struct Collaborators {
    pub price_source: Arc<dyn PriceSource>,
    pub financing: Arc<dyn FinancingAdapter>,
    pub submitter: Arc<dyn TradeSubmitter>,
    pub ledger: Arc<dyn TradeLedger>,
    pub fee_sampler: Arc<dyn FeeSampler>,
}

struct Running {
    subscription: Subscription,
    dispatcher: JoinHandle<()>,
    queue: Arc<TradeQueue<PriceObservation>>,
    started_at: Instant,
}

pub struct ArbitrageEngine {
    config: Arc<Config>,
    price_source: Arc<dyn PriceSource>,
    processor: Arc<TickProcessor>,
    events: Arc<EventBus>,
    running: parking_lot::Mutex<Option<Running>>,
    /// Serializes start/stop so concurrent calls stay idempotent.
    transition: Mutex<()>,
}

impl ArbitrageEngine {
    pub fn new(config: Config, collaborators: Collaborators) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let events = Arc::new(EventBus::new(config.event_channel_capacity));

        let processor = Arc::new(TickProcessor::new(
            Arc::clone(&config),
            collaborators.financing,
            collaborators.submitter,
            collaborators.ledger,
            collaborators.fee_sampler,
            Arc::clone(&events),
        ));

        Ok(Self {
            config,
            price_source: collaborators.price_source,
            processor,
            events,
            running: parking_lot::Mutex::new(None),
            transition: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        if self.running.lock().is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    pub async fn start(&self) -> EngineResult<()> {
        let _transition = self.transition.lock().await;
        if self.running.lock().is_some() {
            debug!("Engine already running");
            return Ok(());
        }

        let handler: Arc<dyn LaneHandler<PriceObservation>> = self.processor.clone();
        let queue = Arc::new(TradeQueue::new(self.config.queue_capacity, handler));

        let (tick_tx, tick_rx) = mpsc::channel(self.config.queue_capacity);
        let subscription = self.price_source.subscribe(tick_tx);
        let dispatcher = tokio::spawn(dispatch_ticks(tick_rx, Arc::clone(&queue), Arc::clone(&self.events)));

        *self.running.lock() = Some(Running {
            subscription,
            dispatcher,
            queue,
            started_at: Instant::now(),
        });

        info!(
            "🚀 Engine started: assets {:?}, threshold {}%, {} funding combinations",
            self.config.assets,
            self.config.profit_threshold_percent,
            self.config.funding_assets.len() * self.config.financing_protocols.len()
        );
        self.events.publish(EngineEvent::Started);
        Ok(())
    }

    /// Stops admitting ticks, drops queued ones and waits for in-flight
    /// ticks to finish before reporting `Stopped`.
    pub async fn stop(&self) -> EngineResult<()> {
        let _transition = self.transition.lock().await;
        let running = self.running.lock().take();
        let Some(running) = running else {
            debug!("Engine already stopped");
            return Ok(());
        };

        running.subscription.unsubscribe();
        running.dispatcher.abort();
        running.queue.shutdown().await;

        info!("🛑 Engine stopped after {}s", running.started_at.elapsed().as_secs());
        self.events.publish(EngineEvent::Stopped);
        Ok(())
    }

    /// Feeds a tick directly, bypassing the price source subscription.
    pub fn submit_tick(&self, observation: PriceObservation) -> EngineResult<()> {
        let queue = self
            .running
            .lock()
            .as_ref()
            .map(|running| Arc::clone(&running.queue))
            .ok_or(EngineError::NotRunning)?;
        admit_tick(&queue, &self.events, observation)
    }

    /// Pushes a fee observation into the rolling history.
    pub async fn record_fee_sample(&self, sample: FeeSample) -> EngineResult<()> {
        self.processor.record_fee_sample(sample).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn add_listener(&self, listener: impl EventListener + 'static) -> ListenerId {
        self.events.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    pub fn set_emergency_shutdown(&self, active: bool) {
        let risk_gate = self.processor.risk_gate();
        if risk_gate.emergency_shutdown_active() == active {
            return;
        }
        risk_gate.set_emergency_shutdown(active);
        let message = if active {
            "Emergency shutdown engaged: all trades vetoed"
        } else {
            "Emergency shutdown released"
        };
        self.events.publish(EngineEvent::Warning(message.to_string()));
    }

    pub fn emergency_shutdown_active(&self) -> bool {
        self.processor.risk_gate().emergency_shutdown_active()
    }

    /// Overwrites the current portfolio value with an external valuation.
    pub async fn update_portfolio_value(&self, value: Decimal) -> EngineResult<()> {
        self.processor.set_portfolio_value(value).await
    }

    pub async fn portfolio(&self) -> PortfolioSnapshot {
        self.processor.portfolio().await
    }

    pub async fn health(&self) -> HealthStatus {
        let (state, active_lanes, uptime_seconds) = match self.running.lock().as_ref() {
            Some(running) => (
                EngineState::Running,
                running.queue.active_lanes(),
                running.started_at.elapsed().as_secs(),
            ),
            None => (EngineState::Stopped, 0, 0),
        };
        let breaker = self.processor.circuit_breaker();

        HealthStatus {
            state,
            consecutive_errors: breaker.consecutive_errors().await,
            circuit_breaker_active: breaker.is_open().await,
            emergency_shutdown: self.emergency_shutdown_active(),
            active_lanes,
            fee_samples: self.processor.optimizer().sample_count().await,
            uptime_seconds,
        }
    }
}

impl Drop for ArbitrageEngine {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            warn!("Engine dropped while running; abandoning queued ticks");
            running.dispatcher.abort();
        }
    }
}

fn admit_tick(
    queue: &TradeQueue<PriceObservation>,
    events: &EventBus,
    observation: PriceObservation,
) -> EngineResult<()> {
    let asset = observation.asset.clone();
    match queue.enqueue(&asset, observation) {
        Ok(()) => Ok(()),
        Err(e @ EngineError::QueueFull { .. }) => {
            warn!(asset = %asset, "Dropping tick: {}", e);
            events.publish(EngineEvent::Warning(format!("Dropped {} tick: {}", asset, e)));
            Err(e)
        }
        Err(e) => Err(e),
    }
}

async fn dispatch_ticks(
    mut ticks: mpsc::Receiver<PriceObservation>,
    queue: Arc<TradeQueue<PriceObservation>>,
    events: Arc<EventBus>,
) {
    while let Some(observation) = ticks.recv().await {
        match admit_tick(&queue, &events, observation) {
            Ok(()) | Err(EngineError::QueueFull { .. }) => {}
            Err(EngineError::NotRunning) => break,
            Err(e) => warn!("Tick not admitted: {}", e),
        }
    }
    debug!("Tick dispatcher finished");
}
