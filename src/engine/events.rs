//! Typed event bus owned by the engine

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;
use crate::types::EngineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Synchronous event callback. Must return quickly; spawn for slow work.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<F> EventListener for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Delivers every event to registered listeners and to broadcast receivers.
/// Publishing never depends on anyone listening.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EventListener>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receiver for asynchronous consumers; dropping it detaches.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn add_listener(&self, listener: impl EventListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<dyn EventListener> = Arc::new(listener);
        self.listeners.write().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len() + self.sender.receiver_count()
    }

    pub fn publish(&self, event: EngineEvent) {
        debug!(event = event.kind(), "Publishing engine event");

        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_event(&event);
        }

        // No receivers is fine.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_listeners_attach_and_detach() {
        let bus = EventBus::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = bus.add_listener(move |event: &EngineEvent| sink.lock().push(event.kind()));

        bus.publish(EngineEvent::Started);
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
        bus.publish(EngineEvent::Stopped);

        assert_eq!(*seen.lock(), vec!["started"]);
    }

    #[tokio::test]
    async fn test_broadcast_subscribers_receive_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(EngineEvent::Warning("stale price".to_string()));
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::Warning("stale price".to_string()));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(1);
        bus.publish(EngineEvent::Started);
        assert_eq!(bus.listener_count(), 0);
    }
}
