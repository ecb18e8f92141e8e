//! Retry policy with fixed or exponential backoff and per-attempt deadlines

use std::future::Future;
use std::time::Duration;
use tracing::warn;
use crate::{
    config::Config,
    errors::{EngineError, EngineResult},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential { base: f64, max_delay_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff: Backoff,
    /// Deadline applied to each individual attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff: Backoff::Exponential { base: 2.0, max_delay_ms: 5000 },
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: delay.as_millis() as u64,
            backoff: Backoff::Fixed,
            attempt_timeout: None,
        }
    }

    /// Fixed-delay policy for external calls, bounded by the configured deadline.
    pub fn from_config(config: &Config) -> Self {
        Self::fixed(config.max_retries, config.retry_delay()).with_timeout(config.call_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    fn next_delay(&self, delay: u64) -> u64 {
        match self.backoff {
            Backoff::Fixed => delay,
            Backoff::Exponential { base, max_delay_ms } => {
                let delay = ((delay as f64 * base) as u64).min(max_delay_ms);
                let jitter = (delay as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
                delay.saturating_add_signed(jitter)
            }
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the policy is exhausted. Returns the result with the number of attempts made.
pub async fn retry_counted<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    context: &str,
) -> (EngineResult<T>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = policy.initial_delay_ms;

    loop {
        attempt += 1;

        let result = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout {
                    operation: context.to_string(),
                    after: limit,
                }),
            },
            None => operation(attempt).await,
        };

        match result {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if !e.is_retryable() => return (Err(e), attempt),
            Err(e) if attempt >= max_attempts => {
                return (
                    Err(EngineError::RetriesExhausted {
                        operation: context.to_string(),
                        attempts: attempt,
                        last_error: Box::new(e),
                    }),
                    attempt,
                );
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt, max_attempts, context, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}

pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    policy: &RetryPolicy,
    context: &str,
) -> EngineResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    retry_counted(operation, policy, context).await.0
}
