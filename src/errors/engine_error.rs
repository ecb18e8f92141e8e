//! Custom error types for the engine

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    #[error("Insufficient fee history: {samples} samples (need {required})")]
    InsufficientFeeHistory {
        samples: usize,
        required: usize,
    },

    #[error("Cost bound exceeded: strategy costs {total_cost}, limit is {max_cost}")]
    CostBoundExceeded {
        total_cost: Decimal,
        max_cost: Decimal,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("{operation} failed: {message}")]
    External {
        operation: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<EngineError>,
    },

    #[error("Trade queue for {asset} is full ({capacity} pending)")]
    QueueFull {
        asset: String,
        capacity: usize,
    },

    #[error("Engine is not running")]
    NotRunning,

    #[error("Circuit breaker active: {reason}")]
    CircuitBreakerOpen {
        reason: String,
        cooldown_remaining: Duration,
    },

    #[error("Trade ledger error: {source}")]
    Ledger {
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn external(operation: impl Into<String>, source: anyhow::Error) -> Self {
        EngineError::External {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::External {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Timeouts and collaborator failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Timeout { .. } | EngineError::External { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
