//! Spread Arbitrage Bot - Main Entry Point
//!
//! Paper-trades DEX/CEX spreads with simulated funding and venues.

use spread_arb_bot::*;
use anyhow::Result;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{error, info, warn};
use spread_arb_bot::{
    adapters::{ChannelPriceSource, FeeSampler, HttpPriceSource, PriceSource},
    execution::{SimulatedFeeSampler, SimulatedFinancingAdapter, SimulatedTradeSubmitter},
    storage::JsonlTradeLedger,
    utils::{LoggingConfig, SessionStats, TRADES_DIR},
};

const STATS_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Configuration first so logging can honour LOG_JSON
    let config = Config::from_env()?;

    utils::setup_output_directories()?;
    let _logging_guard = utils::setup_logging(&LoggingConfig::from_config(&config))?;

    info!("🛩️  Spread Arbitrage Bot v{} - paper trading", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Assets: {:?}", config.assets);
    info!("   Profit Threshold: {}%", config.profit_threshold_percent);
    info!("   Trade Size: {} (max {})", config.trade_size, config.max_trade_size);
    info!("   Funding: {:?} via {:?}", config.funding_assets, config.financing_protocols);
    info!("   Retries: {} x {}ms", config.max_retries, config.retry_delay_ms);
    info!("   Live Capital: {}", config.live_capital);
    if config.emergency_shutdown {
        warn!("   🚨 Emergency shutdown is ON - every trade will be vetoed");
    }

    let price_source: Arc<dyn PriceSource> = match HttpPriceSource::from_config(&config)? {
        Some(source) => {
            info!("🔗 Polling venue quotes every {}ms", config.price_poll_interval_ms);
            Arc::new(source)
        }
        None => {
            warn!("No DEX_PRICE_URL/CEX_PRICE_URL configured, using a simulated price feed");
            let source = ChannelPriceSource::new();
            tokio::spawn(run_simulated_feed(
                source.clone(),
                config.assets.clone(),
                Duration::from_millis(config.price_poll_interval_ms),
            ));
            Arc::new(source)
        }
    };

    let fee_sampler = Arc::new(SimulatedFeeSampler::default());
    let collaborators = Collaborators {
        price_source,
        financing: Arc::new(SimulatedFinancingAdapter::default()),
        submitter: Arc::new(SimulatedTradeSubmitter::default()),
        ledger: Arc::new(JsonlTradeLedger::new(TRADES_DIR)?),
        fee_sampler: fee_sampler.clone(),
    };

    let min_samples = config.min_history_samples;
    let engine = Arc::new(ArbitrageEngine::new(config, collaborators)?);

    // Warm the fee history so the first opportunity can be priced
    for _ in 0..min_samples {
        match fee_sampler.sample().await {
            Ok(sample) => engine.record_fee_sample(sample).await?,
            Err(e) => warn!("Fee warm-up sample failed: {}", e),
        }
    }

    let events = engine.subscribe();
    let printer = tokio::spawn(print_events(Arc::clone(&engine), events));

    engine.start().await?;
    info!("\n🚀 Engine running, press Ctrl+C to stop...\n");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("\n📛 Received shutdown signal (Ctrl+C)...");

    engine.stop().await?;
    // The printer exits once it has drained the Stopped event
    if let Err(e) = printer.await {
        error!("Event printer failed: {}", e);
    }

    Ok(())
}

/// Prints events as they arrive and session statistics periodically.
async fn print_events(engine: Arc<ArbitrageEngine>, mut events: broadcast::Receiver<EngineEvent>) {
    let mut stats = SessionStats::new();
    let mut interval = time::interval(Duration::from_secs(STATS_INTERVAL_SECS));
    interval.tick().await;

    loop {
        tokio::select! {
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Event printer lagged, {} events missed", missed);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                stats.record(&event);

                match &event {
                    EngineEvent::Opportunity(opportunity) => utils::print_opportunity(opportunity),
                    EngineEvent::TradeExecuted(record) => utils::print_trade_record(record),
                    EngineEvent::Warning(message) => warn!("⚠️  {}", message),
                    EngineEvent::Error(err) => error!("❌ {}", err.message),
                    EngineEvent::Started => info!("✅ Engine started"),
                    EngineEvent::Stopped => {
                        info!("\n🛑 Shutting down gracefully...");
                        utils::print_session_stats(&stats, &engine.health().await);
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                utils::print_session_stats(&stats, &engine.health().await);
            }
        }
    }
}

/// Random-walk quotes with an occasional venue dislocation.
async fn run_simulated_feed(source: ChannelPriceSource, assets: Vec<String>, every: Duration) {
    let mut interval = time::interval(every);
    let mut mids: Vec<Decimal> = assets.iter().map(|_| dec!(3000)).collect();

    loop {
        interval.tick().await;
        for (asset, mid) in assets.iter().zip(mids.iter_mut()) {
            let drift = Decimal::from_f64((rand::random::<f64>() - 0.5) * 0.002).unwrap_or_default();
            *mid = (*mid * (Decimal::ONE + drift)).round_dp(4);

            // Roughly one tick in ten shows a tradeable gap
            let gap = if rand::random::<f64>() < 0.1 {
                Decimal::from_f64(0.01 + rand::random::<f64>() * 0.01).unwrap_or_default()
            } else {
                Decimal::from_f64(rand::random::<f64>() * 0.004).unwrap_or_default()
            };
            let cex = (*mid * (Decimal::ONE + gap)).round_dp(4);

            source.publish(PriceObservation::new(asset.clone(), *mid, cex)).await;
        }
    }
}
