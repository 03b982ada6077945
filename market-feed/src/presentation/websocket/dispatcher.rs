use crate::application::ChangeConsolidator;
use crate::application::ports::OutboundFrame;
use crate::domain::ChangeEvent;
use crate::infrastructure::SubscriptionRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::message::encode;

/// Outcome of dispatching one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Consolidated entries produced for the tick
    pub entries: usize,
    /// Connections that had a payload queued
    pub delivered: usize,
    /// Connections whose payload could not be queued
    pub failed: usize,
}

/// Fans each tick's consolidated changes out to subscribed connections
///
/// Consolidation runs once per tick and the result is shared by all
/// connections. Payloads are handed to each connection's writer task without
/// waiting, so one stalled socket neither delays other connections nor the
/// next tick; its payload is dropped and logged instead.
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    consolidator: ChangeConsolidator,
}

impl Dispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, consolidator: ChangeConsolidator) -> Self {
        Dispatcher {
            registry,
            consolidator,
        }
    }

    pub fn consolidator(&self) -> &ChangeConsolidator {
        &self.consolidator
    }

    /// Consolidate one tick and queue per-connection payloads
    pub fn dispatch(&mut self, event: &ChangeEvent) -> DispatchStats {
        let mut stats = DispatchStats::default();
        if self.registry.is_empty() {
            return stats;
        }

        let entries = self.consolidator.consolidate(event);
        stats.entries = entries.len();
        if entries.is_empty() {
            return stats;
        }

        for connection in self.registry.connections() {
            let subset = connection.filter(&entries);
            if subset.is_empty() {
                continue;
            }

            let queued = encode(&subset)
                .and_then(|payload| connection.try_send(OutboundFrame::Text(payload)));
            match queued {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        connection_id = %connection.id(),
                        tick = event.tick,
                        error = %e,
                        "Dropped tick update"
                    );
                }
            }
        }

        tracing::debug!(
            tick = event.tick,
            entries = stats.entries,
            delivered = stats.delivered,
            failed = stats.failed,
            "Tick dispatched"
        );
        stats
    }

    /// Consume change events until the channel closes
    pub async fn run(mut self, mut events: broadcast::Receiver<ChangeEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    self.dispatch(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Skipped deletions are never tombstoned and skipped
                    // updates are compared against older values
                    tracing::warn!(
                        skipped,
                        cached = self.consolidator.len(),
                        "Dispatcher lagging, ticks skipped; consolidation cache may be stale"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Change event channel closed, dispatcher stopping");
                    break;
                }
            }
        }
    }

    /// Run on a background task
    pub fn spawn(self, events: broadcast::Receiver<ChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}
