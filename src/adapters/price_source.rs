//! Price source contract and an in-process push implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use crate::types::PriceObservation;

pub type TickSender = mpsc::Sender<PriceObservation>;

/// Emits price observations for venue pairs.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Deliver observations to `on_tick` until the returned handle is
    /// unsubscribed or dropped.
    fn subscribe(&self, on_tick: TickSender) -> Subscription;

    /// Latest observation for `asset`. Transient failures yield `None`.
    async fn current_observation(&self, asset: &str) -> Option<PriceObservation>;
}

/// Handle returned by [`PriceSource::subscribe`]; unsubscribes on drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

#[derive(Default)]
struct ChannelInner {
    next_id: u64,
    subscribers: Vec<(u64, TickSender)>,
    latest: HashMap<String, PriceObservation>,
}

/// Price source fed by the embedding application via [`publish`](Self::publish).
#[derive(Clone, Default)]
pub struct ChannelPriceSource {
    inner: Arc<Mutex<ChannelInner>>,
}

impl ChannelPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an observation to every subscriber. Returns how many received it.
    pub async fn publish(&self, observation: PriceObservation) -> usize {
        let subscribers: Vec<TickSender> = {
            let mut inner = self.inner.lock();
            inner.latest.insert(observation.asset.clone(), observation.clone());
            inner.subscribers.iter().map(|(_, tx)| tx.clone()).collect()
        };

        let mut delivered = 0;
        for tx in subscribers {
            if tx.send(observation.clone()).await.is_ok() {
                delivered += 1;
            } else {
                debug!(asset = %observation.asset, "Dropping tick for closed subscriber");
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

#[async_trait]
impl PriceSource for ChannelPriceSource {
    fn subscribe(&self, on_tick: TickSender) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.subscribers.push((id, on_tick));
            id
        };

        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
        })
    }

    async fn current_observation(&self, asset: &str) -> Option<PriceObservation> {
        self.inner.lock().latest.get(asset).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_publish_reaches_subscribers_until_unsubscribed() {
        let source = ChannelPriceSource::new();
        let (tx, mut rx) = mpsc::channel(4);
        let subscription = source.subscribe(tx);

        let delivered = source.publish(PriceObservation::new("ETH", dec!(1000), dec!(1010))).await;
        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap().cex_price, dec!(1010));

        subscription.unsubscribe();
        assert_eq!(source.subscriber_count(), 0);
        let delivered = source.publish(PriceObservation::new("ETH", dec!(1000), dec!(1020))).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_current_observation_tracks_latest() {
        let source = ChannelPriceSource::new();
        assert!(source.current_observation("ETH").await.is_none());
        source.publish(PriceObservation::new("ETH", dec!(1000), dec!(1001))).await;
        source.publish(PriceObservation::new("ETH", dec!(1002), dec!(1001))).await;
        let latest = source.current_observation("ETH").await.unwrap();
        assert_eq!(latest.dex_price, dec!(1002));
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let source = ChannelPriceSource::new();
        let (tx, _rx) = mpsc::channel(1);
        {
            let _subscription = source.subscribe(tx);
            assert_eq!(source.subscriber_count(), 1);
        }
        assert_eq!(source.subscriber_count(), 0);
    }
}
