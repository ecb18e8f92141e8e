//! Engine configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    errors::{EngineError, EngineResult},
    types::Complexity,
};

// Detection & risk defaults
pub const DEFAULT_PROFIT_THRESHOLD_PCT: Decimal = dec!(1.0);
pub const DEFAULT_MANIPULATION_THRESHOLD_PCT: Decimal = dec!(5.0);
pub const DEFAULT_MAX_TRADE_SIZE: Decimal = dec!(100);
pub const DEFAULT_TRADE_SIZE: Decimal = dec!(10);
pub const DEFAULT_MAX_DRAWDOWN_PCT: Decimal = dec!(10);
pub const DEFAULT_INITIAL_PORTFOLIO_VALUE: Decimal = dec!(10000);

// Cost strategy defaults
pub const DEFAULT_MIN_PROFIT_MARGIN: Decimal = dec!(0.02);
pub const DEFAULT_MAX_PRIORITY_FEE: Decimal = dec!(0.00001);
pub const DEFAULT_BASE_UNIT_LIMIT: u64 = 150_000;
pub const DEFAULT_HISTORY_WINDOW: usize = 1000;
pub const DEFAULT_MIN_HISTORY_SAMPLES: usize = 5;

// Execution defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const MAX_RETRIES_CEILING: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    // Opportunity detection
    pub profit_threshold_percent: Decimal,
    pub trade_size: Decimal,
    pub assets: Vec<String>,
    // Risk gate
    pub max_trade_size: Decimal,
    pub manipulation_threshold_percent: Decimal,
    pub max_drawdown_percent: Decimal,
    pub live_capital: bool,
    pub emergency_shutdown: bool,
    pub initial_portfolio_value: Decimal,
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
    // Cost strategy
    pub min_profit_margin: Decimal,
    pub max_priority_fee: Decimal,
    pub base_unit_limit: u64,
    pub history_window_size: usize,
    pub min_history_samples: usize,
    pub complexity: Complexity,
    // Execution
    pub funding_assets: Vec<String>,
    pub financing_protocols: Vec<String>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub call_timeout_ms: u64,
    pub queue_capacity: usize,
    pub event_channel_capacity: usize,
    // Price source
    pub dex_price_url: Option<String>,
    pub cex_price_url: Option<String>,
    pub price_poll_interval_ms: u64,
    // Logging
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profit_threshold_percent: DEFAULT_PROFIT_THRESHOLD_PCT,
            trade_size: DEFAULT_TRADE_SIZE,
            assets: vec!["ETH".to_string()],
            max_trade_size: DEFAULT_MAX_TRADE_SIZE,
            manipulation_threshold_percent: DEFAULT_MANIPULATION_THRESHOLD_PCT,
            max_drawdown_percent: DEFAULT_MAX_DRAWDOWN_PCT,
            live_capital: false,
            emergency_shutdown: false,
            initial_portfolio_value: DEFAULT_INITIAL_PORTFOLIO_VALUE,
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 300, // 5 minutes
            min_profit_margin: DEFAULT_MIN_PROFIT_MARGIN,
            max_priority_fee: DEFAULT_MAX_PRIORITY_FEE,
            base_unit_limit: DEFAULT_BASE_UNIT_LIMIT,
            history_window_size: DEFAULT_HISTORY_WINDOW,
            min_history_samples: DEFAULT_MIN_HISTORY_SAMPLES,
            complexity: Complexity::Medium,
            funding_assets: vec!["USDC".to_string(), "WETH".to_string()],
            financing_protocols: vec!["aave".to_string(), "balancer".to_string()],
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            dex_price_url: None,
            cex_price_url: None,
            price_poll_interval_ms: 2000,
            log_json: false,
        }
    }
}

impl Config {
    /// Build from process environment variables. Unset keys take their
    /// default; keys that are set but unparseable are an error.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            profit_threshold_percent: parse_or(&lookup, "PROFIT_THRESHOLD_PERCENT", defaults.profit_threshold_percent)?,
            trade_size: parse_or(&lookup, "TRADE_SIZE", defaults.trade_size)?,
            assets: list_or(&lookup, "ASSETS", defaults.assets),
            max_trade_size: parse_or(&lookup, "MAX_TRADE_SIZE", defaults.max_trade_size)?,
            manipulation_threshold_percent: parse_or(
                &lookup,
                "MANIPULATION_THRESHOLD_PERCENT",
                defaults.manipulation_threshold_percent,
            )?,
            max_drawdown_percent: parse_or(&lookup, "MAX_DRAWDOWN_PERCENT", defaults.max_drawdown_percent)?,
            live_capital: parse_or(&lookup, "LIVE_CAPITAL", defaults.live_capital)?,
            emergency_shutdown: parse_or(&lookup, "EMERGENCY_SHUTDOWN", defaults.emergency_shutdown)?,
            initial_portfolio_value: parse_or(&lookup, "INITIAL_PORTFOLIO_VALUE", defaults.initial_portfolio_value)?,
            max_consecutive_errors: parse_or(&lookup, "MAX_CONSECUTIVE_ERRORS", defaults.max_consecutive_errors)?,
            circuit_breaker_cooldown_secs: parse_or(
                &lookup,
                "CIRCUIT_BREAKER_COOLDOWN_SECS",
                defaults.circuit_breaker_cooldown_secs,
            )?,
            min_profit_margin: parse_or(&lookup, "MIN_PROFIT_MARGIN", defaults.min_profit_margin)?,
            max_priority_fee: parse_or(&lookup, "MAX_PRIORITY_FEE", defaults.max_priority_fee)?,
            base_unit_limit: parse_or(&lookup, "BASE_UNIT_LIMIT", defaults.base_unit_limit)?,
            history_window_size: parse_or(&lookup, "HISTORY_WINDOW_SIZE", defaults.history_window_size)?,
            min_history_samples: parse_or(&lookup, "MIN_HISTORY_SAMPLES", defaults.min_history_samples)?,
            complexity: parse_or(&lookup, "COMPLEXITY", defaults.complexity)?,
            funding_assets: list_or(&lookup, "FUNDING_ASSETS", defaults.funding_assets),
            financing_protocols: list_or(&lookup, "FINANCING_PROTOCOLS", defaults.financing_protocols),
            max_retries: parse_or(&lookup, "MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: parse_or(&lookup, "RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            call_timeout_ms: parse_or(&lookup, "CALL_TIMEOUT_MS", defaults.call_timeout_ms)?,
            queue_capacity: parse_or(&lookup, "QUEUE_CAPACITY", defaults.queue_capacity)?,
            event_channel_capacity: parse_or(&lookup, "EVENT_CHANNEL_CAPACITY", defaults.event_channel_capacity)?,
            dex_price_url: lookup("DEX_PRICE_URL").filter(|s| !s.trim().is_empty()),
            cex_price_url: lookup("CEX_PRICE_URL").filter(|s| !s.trim().is_empty()),
            price_poll_interval_ms: parse_or(&lookup, "PRICE_POLL_INTERVAL_MS", defaults.price_poll_interval_ms)?,
            log_json: parse_or(&lookup, "LOG_JSON", defaults.log_json)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let positive = [
            ("profit_threshold_percent", self.profit_threshold_percent),
            ("trade_size", self.trade_size),
            ("max_trade_size", self.max_trade_size),
            ("manipulation_threshold_percent", self.manipulation_threshold_percent),
            ("max_drawdown_percent", self.max_drawdown_percent),
            ("initial_portfolio_value", self.initial_portfolio_value),
            ("max_priority_fee", self.max_priority_fee),
        ];
        for (name, value) in positive {
            if value <= dec!(0) {
                return Err(config_error(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.min_profit_margin <= dec!(0) || self.min_profit_margin > dec!(1) {
            return Err(config_error(format!(
                "min_profit_margin must be in (0, 1], got {}",
                self.min_profit_margin
            )));
        }
        if self.max_drawdown_percent >= dec!(100) {
            return Err(config_error("max_drawdown_percent must be below 100"));
        }
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES_CEILING {
            return Err(config_error(format!(
                "max_retries must be between 1 and {}, got {}",
                MAX_RETRIES_CEILING, self.max_retries
            )));
        }
        if self.base_unit_limit == 0 {
            return Err(config_error("base_unit_limit must be positive"));
        }
        if self.history_window_size < self.min_history_samples || self.min_history_samples == 0 {
            return Err(config_error(format!(
                "history_window_size ({}) must hold at least min_history_samples ({}), which must be positive",
                self.history_window_size, self.min_history_samples
            )));
        }
        if self.call_timeout_ms == 0 {
            return Err(config_error("call_timeout_ms must be positive"));
        }
        if self.queue_capacity == 0 || self.event_channel_capacity == 0 {
            return Err(config_error("queue and event channel capacities must be positive"));
        }
        if self.assets.is_empty() {
            return Err(config_error("at least one asset must be configured"));
        }
        if self.funding_assets.is_empty() || self.financing_protocols.is_empty() {
            return Err(config_error(
                "at least one funding asset and one financing protocol must be configured",
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn config_error(message: impl Into<String>) -> EngineError {
    EngineError::Config { message: message.into() }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> EngineResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            config_error(format!("{}='{}' is not valid: {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}

fn list_or<F>(lookup: &F, key: &str, default: Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let items: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if items.is_empty() { default } else { items }
        }
        None => default,
    }
}
