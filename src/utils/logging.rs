//! Logging setup and configuration

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::Config;

pub const LOG_DIR: &str = "output/logs";
pub const TRADES_DIR: &str = "output/trades";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Console output as JSON lines instead of human-readable text.
    pub json: bool,
    pub default_directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(LOG_DIR),
            file_prefix: "spread-arb-bot.log".to_string(),
            json: false,
            default_directive: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            json: config.log_json,
            ..Self::default()
        }
    }
}

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

pub fn setup_logging(config: &LoggingConfig) -> Result<Arc<LoggingGuard>> {
    let file_appender = tracing_appender::rolling::hourly(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_thread_ids(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_ansi(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .compact()
        )
        .with(EnvFilter::from_default_env().add_directive(config.default_directive.parse()?))
        .init();

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

pub fn setup_output_directories() -> Result<()> {
    use std::fs;

    fs::create_dir_all(LOG_DIR)?;
    fs::create_dir_all(TRADES_DIR)?;

    Ok(())
}
