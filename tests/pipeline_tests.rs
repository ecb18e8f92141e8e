mod common;

use common::*;
use rust_decimal_macros::dec;
use std::time::Duration;
use spread_arb_bot::{EngineEvent, PriceObservation, TradeStatus};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_one_percent_spread_emits_opportunity_and_trades() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);

    let opportunity = h
        .events()
        .into_iter()
        .find_map(|e| match e {
            EngineEvent::Opportunity(o) => Some(o),
            _ => None,
        })
        .expect("opportunity event");
    assert_eq!(opportunity.dex_price, dec!(1000));
    assert_eq!(opportunity.cex_price, dec!(1010));
    assert_eq!(opportunity.spread_percent, dec!(1));

    let records = h.ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, TradeStatus::Completed);
    assert_eq!(records[0].asset, "ETH");
    assert_eq!(records[0].financing_protocol, "aave");
    // Bought on the cheaper venue
    assert!(h.submitter.orders.lock().iter().all(|o| o.price == dec!(1000)));

    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_small_spread_is_ignored() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1003))).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.count("opportunity"), 0);
    assert_eq!(h.financing.call_count(), 0);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_prices_are_dropped_silently() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(0), dec!(1010))).unwrap();
    h.engine.submit_tick(PriceObservation::new("ETH", dec!(-5), dec!(1010))).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.engine.stop().await.unwrap();

    let kinds: Vec<&str> = h.events().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["started", "stopped"]);
}

#[tokio::test]
async fn test_oversized_trade_is_vetoed_before_funding() {
    let config = spread_arb_bot::Config {
        trade_size: dec!(150),
        max_trade_size: dec!(100),
        ..test_config()
    };
    let h = Harness::new(config, MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("warning", 1, WAIT).await);

    assert!(h.warnings().iter().any(|w| w.contains("trade-size limit")));
    assert_eq!(h.financing.call_count(), 0);
    assert_eq!(h.submitter.order_count(), 0);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_manipulated_prices_are_vetoed() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1200))).unwrap();
    assert!(h.wait_for("warning", 1, WAIT).await);

    assert_eq!(h.count("opportunity"), 1);
    assert!(h.warnings().iter().any(|w| w.contains("manipulation")));
    assert_eq!(h.financing.call_count(), 0);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_emergency_shutdown_vetoes_everything() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();
    h.engine.set_emergency_shutdown(true);
    assert!(h.engine.health().await.emergency_shutdown);

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("warning", 2, WAIT).await);
    assert!(h.warnings().iter().any(|w| w.contains("Emergency shutdown active")));
    assert_eq!(h.financing.call_count(), 0);

    h.engine.set_emergency_shutdown(false);
    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_drawdown_limit_applies_with_live_capital() {
    let config = spread_arb_bot::Config { live_capital: true, ..test_config() };
    let h = Harness::new(config, MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.update_portfolio_value(dec!(8500)).await.unwrap();
    assert!(h.engine.update_portfolio_value(dec!(-1)).await.is_err());
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("warning", 1, WAIT).await);
    assert!(h.warnings().iter().any(|w| w.contains("drawdown")));
    assert_eq!(h.financing.call_count(), 0);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_signal_never_trades_more_than_the_size_cap() {
    let config = spread_arb_bot::Config {
        trade_size: dec!(100),
        max_trade_size: dec!(100),
        funding_assets: vec!["USDC".to_string(), "WETH".to_string()],
        ..test_config()
    };
    let h = Harness::new(config, MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    h.engine.stop().await.unwrap();

    assert_eq!(h.count("opportunity"), 1);
    assert_eq!(h.count("tradeExecuted"), 1);
    let total: rust_decimal::Decimal = h.ledger.records().iter().map(|r| r.amount).sum();
    assert!(total <= dec!(100), "executed {} for one signal", total);
    assert_eq!(h.financing.call_count(), 1);
}

#[tokio::test]
async fn test_failing_asset_does_not_block_others() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::failing_for("BTC")).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("BTC", dec!(50000), dec!(50600))).unwrap();
    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();

    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    assert!(h.wait_for("error", 2, WAIT).await);

    let failed: Vec<_> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::Error(err) => err.context,
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|c| c.asset == "BTC" && c.attempts == 4));
    let protocols: Vec<_> = failed.iter().map(|c| c.financing_protocol.as_str()).collect();
    assert_eq!(protocols, vec!["aave", "balancer"]);

    assert!(h.ledger.records().iter().all(|r| r.asset == "ETH"));
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_failing_protocol_does_not_block_other_protocols() {
    let financing = MockFinancing {
        failing_protocols: ["aave".to_string()].into_iter().collect(),
        ..MockFinancing::default()
    };
    let h = Harness::new(test_config(), financing, MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    assert!(h.wait_for("error", 1, WAIT).await);

    // Three funding tries on aave, one on balancer
    assert_eq!(h.financing.call_count(), 4);
    let records = h.ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].financing_protocol, "balancer");
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_same_asset_ticks_are_serialized_in_order() {
    let h = Harness::new(
        test_config(),
        MockFinancing::with_delay(Duration::from_millis(50)),
        MockSubmitter::default(),
    )
    .await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.engine.submit_tick(PriceObservation::new("ETH", dec!(2000), dec!(2020))).unwrap();

    assert!(h.wait_for("tradeExecuted", 2, WAIT).await);
    let mut spans = h.financing.spans();
    spans.sort_by_key(|s| s.started);

    for pair in spans.windows(2) {
        assert!(pair[1].started >= pair[0].finished, "funding calls overlapped: {:?}", pair);
    }
    // FIFO: the first tick's trade is recorded before the second's
    let prices: Vec<_> = h.ledger.records().iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![dec!(1000), dec!(2000)]);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_different_assets_proceed_concurrently() {
    let h = Harness::new(
        test_config(),
        MockFinancing::with_delay(Duration::from_millis(50)),
        MockSubmitter::default(),
    )
    .await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    h.engine.submit_tick(PriceObservation::new("BTC", dec!(50000), dec!(50600))).unwrap();
    assert!(h.wait_for("tradeExecuted", 2, WAIT).await);

    let spans = h.financing.spans();
    let overlapping = spans.iter().any(|a| {
        spans
            .iter()
            .any(|b| a.label != b.label && a.started < b.finished && b.started < a.finished)
    });
    assert!(overlapping, "expected ETH and BTC funding to overlap");
    assert_eq!(h.engine.health().await.active_lanes, 2);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_missing_fee_history_fails_closed() {
    let h = Harness::with_fees(
        test_config(),
        MockFinancing::default(),
        MockSubmitter::default(),
        FlatFeeSampler::default(),
        false,
    )
    .await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("error", 1, WAIT).await);

    let message = h
        .events()
        .into_iter()
        .find_map(|e| match e {
            EngineEvent::Error(err) => Some(err.message),
            _ => None,
        })
        .unwrap();
    assert!(message.contains("Insufficient fee history"));
    assert_eq!(h.financing.call_count(), 0);
    assert_eq!(h.engine.health().await.fee_samples, 1);
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_fee_sampler_outage_is_a_warning() {
    let fees = FlatFeeSampler { fail: true, ..FlatFeeSampler::default() };
    let h = Harness::with_fees(test_config(), MockFinancing::default(), MockSubmitter::default(), fees, true).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    assert!(h.warnings().iter().any(|w| w.contains("Fee sample unavailable")));
    h.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_circuit_breaker_skips_after_repeated_failures() {
    let config = spread_arb_bot::Config {
        max_consecutive_errors: 2,
        ..test_config()
    };
    let h = Harness::new(config, MockFinancing::default(), MockSubmitter::failing_for("ETH")).await;
    h.engine.start().await.unwrap();

    for _ in 0..3 {
        h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    }
    assert!(h.wait_for("opportunity", 3, WAIT).await);
    h.engine.stop().await.unwrap();

    let warnings = h.warnings();
    assert!(warnings.iter().any(|w| w.contains("Circuit breaker opened")));
    assert!(warnings.iter().any(|w| w.contains("Skipped ETH opportunity")));
    // Two ticks x two protocols x three submission tries
    assert_eq!(h.submitter.order_count(), 12);

    let health = h.engine.health().await;
    assert!(health.circuit_breaker_active);
    assert_eq!(health.consecutive_errors, 2);
}

#[tokio::test]
async fn test_profit_updates_portfolio() {
    let h = Harness::new(test_config(), MockFinancing::default(), MockSubmitter::default()).await;
    h.engine.start().await.unwrap();

    h.engine.submit_tick(PriceObservation::new("ETH", dec!(1000), dec!(1010))).unwrap();
    assert!(h.wait_for("tradeExecuted", 1, WAIT).await);
    h.engine.stop().await.unwrap();

    let realised: rust_decimal::Decimal = h.ledger.records().iter().map(|r| r.profit_loss).sum();
    assert!(realised > dec!(0));
    let portfolio = h.engine.portfolio().await;
    assert_eq!(portfolio.current_value, dec!(10000) + realised);
}
