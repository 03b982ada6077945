use crate::application::ports::EventPublisher;
use crate::domain::ChangeEvent;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Broadcast-based change event publisher
///
/// Uses a tokio broadcast channel so publishing never waits on consumers.
/// A receiver that falls more than `capacity` events behind observes
/// `RecvError::Lagged` and skips ahead.
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<ChangeEvent>,
    capacity: usize,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        BroadcastEventPublisher { tx, capacity }
    }

    /// Subscribe to all change events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Clone for BroadcastEventPublisher {
    fn clone(&self) -> Self {
        BroadcastEventPublisher {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: ChangeEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.tx.send(event);
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let publisher = BroadcastEventPublisher::new(16);
        let mut rx = publisher.subscribe();

        publisher.publish(ChangeEvent::new(1, vec![], vec![3])).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.tick, 1);
        assert_eq!(received.deleted, vec![3]);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let publisher = BroadcastEventPublisher::new(16);
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish(ChangeEvent::default()).await;

        let _rx = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let publisher = BroadcastEventPublisher::new(2);
        let mut rx = publisher.subscribe();

        for tick in 1..=4 {
            publisher.publish(ChangeEvent::new(tick, vec![], vec![])).await;
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().tick, 3);
    }
}
