//! Per-asset FIFO lanes with at most one item in flight per asset

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use crate::errors::{EngineError, EngineResult};

#[async_trait]
pub trait LaneHandler<T>: Send + Sync + 'static {
    async fn handle(&self, item: T);
}

struct Lane<T> {
    sender: mpsc::Sender<T>,
    worker: JoinHandle<()>,
}

/// Each key gets a bounded channel drained by a single worker task, so
/// items for one key are handled strictly in arrival order and never
/// concurrently, while different keys proceed in parallel.
pub struct TradeQueue<T: Send + 'static> {
    lanes: Mutex<HashMap<String, Lane<T>>>,
    capacity: usize,
    closed: Arc<AtomicBool>,
    handler: Arc<dyn LaneHandler<T>>,
}

impl<T: Send + 'static> TradeQueue<T> {
    pub fn new(capacity: usize, handler: Arc<dyn LaneHandler<T>>) -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            closed: Arc::new(AtomicBool::new(false)),
            handler,
        }
    }

    pub fn enqueue(&self, key: &str, item: T) -> EngineResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::NotRunning);
        }

        let mut lanes = self.lanes.lock();
        let lane = lanes
            .entry(key.to_string())
            .or_insert_with(|| self.spawn_lane(key));

        match lane.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EngineError::QueueFull {
                asset: key.to_string(),
                capacity: self.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(EngineError::NotRunning),
        }
    }

    fn spawn_lane(&self, key: &str) -> Lane<T> {
        let (sender, mut receiver) = mpsc::channel::<T>(self.capacity);
        let handler = Arc::clone(&self.handler);
        let closed = Arc::clone(&self.closed);
        let key = key.to_string();

        debug!(asset = %key, "Opening trade lane");
        let worker = tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                if closed.load(Ordering::SeqCst) {
                    debug!(asset = %key, "Queue closed, discarding pending tick");
                    continue;
                }
                // A panicking tick must not take the lane down with it.
                let handler = Arc::clone(&handler);
                if let Err(e) = tokio::spawn(async move { handler.handle(item).await }).await {
                    warn!(asset = %key, "Tick handler aborted: {}", e);
                }
            }
            debug!(asset = %key, "Trade lane finished");
        });

        Lane { sender, worker }
    }

    pub fn active_lanes(&self) -> usize {
        self.lanes.lock().len()
    }

    /// Items waiting behind the in-flight one for `key`.
    pub fn pending(&self, key: &str) -> usize {
        self.lanes
            .lock()
            .get(key)
            .map(|lane| self.capacity - lane.sender.capacity())
            .unwrap_or(0)
    }

    /// Stops admitting items, discards anything not yet started and waits
    /// for in-flight items to finish. Nothing is cancelled mid-flight.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let lanes: Vec<(String, Lane<T>)> = self.lanes.lock().drain().collect();

        for (key, lane) in lanes {
            drop(lane.sender);
            if let Err(e) = lane.worker.await {
                warn!(asset = %key, "Trade lane worker ended abnormally: {}", e);
            }
        }
    }
}
