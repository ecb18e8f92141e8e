//! Circuit breaker implementation

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};

/// Opens after `max_consecutive_errors` failed ticks and closes again once
/// the cooldown has elapsed or a success is recorded.
pub struct CircuitBreaker {
    consecutive_errors: Arc<RwLock<u32>>,
    is_open: Arc<RwLock<bool>>,
    last_error_time: Arc<RwLock<Option<Instant>>>,
    max_consecutive_errors: u32,
    cooldown_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_errors: u32, cooldown_secs: u64) -> Self {
        Self {
            consecutive_errors: Arc::new(RwLock::new(0)),
            is_open: Arc::new(RwLock::new(false)),
            last_error_time: Arc::new(RwLock::new(None)),
            max_consecutive_errors: max_consecutive_errors.max(1),
            cooldown_duration: Duration::from_secs(cooldown_secs),
        }
    }

    pub async fn record_success(&self) {
        *self.consecutive_errors.write().await = 0;
        *self.is_open.write().await = false;
    }

    /// Returns `true` when this error opened the breaker.
    pub async fn record_error(&self) -> bool {
        let mut errors = self.consecutive_errors.write().await;
        *errors += 1;

        if *errors >= self.max_consecutive_errors {
            let mut is_open = self.is_open.write().await;
            let newly_opened = !*is_open;
            *is_open = true;
            *self.last_error_time.write().await = Some(Instant::now());
            if newly_opened {
                error!("Circuit breaker OPEN after {} consecutive errors", *errors);
            }
            return newly_opened;
        }
        false
    }

    pub async fn can_proceed(&self) -> bool {
        let is_open = *self.is_open.read().await;
        if !is_open {
            return true;
        }

        if let Some(last_error) = *self.last_error_time.read().await {
            if last_error.elapsed() > self.cooldown_duration {
                info!("Circuit breaker cooldown complete, resetting");
                *self.is_open.write().await = false;
                *self.consecutive_errors.write().await = 0;
                return true;
            }
        }
        false
    }

    pub async fn is_open(&self) -> bool {
        *self.is_open.read().await
    }

    pub async fn consecutive_errors(&self) -> u32 {
        *self.consecutive_errors.read().await
    }

    pub async fn cooldown_remaining(&self) -> Duration {
        match *self.last_error_time.read().await {
            Some(last_error) => self.cooldown_duration.saturating_sub(last_error.elapsed()),
            None => Duration::ZERO,
        }
    }
}
