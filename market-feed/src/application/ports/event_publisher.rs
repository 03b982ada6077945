use crate::domain::ChangeEvent;
use async_trait::async_trait;

/// Publisher for per-tick change events
///
/// The generator publishes exactly one event per tick; delivery to the
/// dispatcher is decoupled from the tick loop so a slow consumer never
/// delays the next tick.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a tick's change event to all subscribers
    async fn publish(&self, event: ChangeEvent);

    /// Get the number of active subscribers
    fn subscriber_count(&self) -> usize;
}
