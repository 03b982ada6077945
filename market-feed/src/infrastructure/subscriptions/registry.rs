use crate::application::ports::{ConnectionId, OutboundFrame};
use crate::domain::{ConsolidatedEntry, InstrumentId};
use crate::error::{RegistryError, TransportError};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One live connection: its subscription set and its outbound queue
///
/// The set is written only by the connection's own command loop and read by
/// the dispatcher on every tick.
#[derive(Debug)]
pub struct ConnectionEntry {
    id: ConnectionId,
    subscriptions: RwLock<BTreeSet<InstrumentId>>,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ConnectionEntry {
    fn new(id: ConnectionId, outbound: mpsc::Sender<OutboundFrame>) -> Self {
        ConnectionEntry {
            id,
            subscriptions: RwLock::new(BTreeSet::new()),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_subscribed(&self, id: InstrumentId) -> bool {
        self.subscriptions.read().contains(&id)
    }

    /// Subscribed ids in ascending order
    pub fn subscribed_ids(&self) -> Vec<InstrumentId> {
        self.subscriptions.read().iter().copied().collect()
    }

    /// Entries this connection subscribes to, in input order
    pub fn filter(&self, entries: &[ConsolidatedEntry]) -> Vec<ConsolidatedEntry> {
        let subscriptions = self.subscriptions.read();
        if subscriptions.is_empty() {
            return Vec::new();
        }
        entries
            .iter()
            .filter(|entry| subscriptions.contains(&entry.id()))
            .cloned()
            .collect()
    }

    /// Queue a frame without waiting. Fails if the writer is behind or gone.
    pub fn try_send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::ChannelClosed,
        })
    }

    /// Queue a frame, waiting for room in the outbound queue
    pub async fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Maps each live connection to its subscription set
///
/// Safe against concurrent register/unregister while the dispatcher
/// enumerates connections: `connections()` copies out `Arc` handles so no
/// map lock is held while payloads are queued.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionEntry>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with an empty subscription set
    pub fn register(
        &self,
        id: ConnectionId,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Arc<ConnectionEntry> {
        let entry = Arc::new(ConnectionEntry::new(id, outbound));
        self.connections.insert(id, Arc::clone(&entry));
        entry
    }

    /// Remove a connection and drop its subscriptions
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.remove(&id).map(|(_, entry)| entry)
    }

    /// Add ids to a connection's set. Returns the resulting set size.
    pub fn subscribe(
        &self,
        id: ConnectionId,
        ids: impl IntoIterator<Item = InstrumentId>,
    ) -> Result<usize, RegistryError> {
        let entry = self.entry(id)?;
        let mut subscriptions = entry.subscriptions.write();
        subscriptions.extend(ids);
        Ok(subscriptions.len())
    }

    /// Remove the given ids, or clear the whole set when `ids` is `None`
    pub fn unsubscribe(
        &self,
        id: ConnectionId,
        ids: Option<&[InstrumentId]>,
    ) -> Result<usize, RegistryError> {
        let entry = self.entry(id)?;
        let mut subscriptions = entry.subscriptions.write();
        match ids {
            Some(ids) => {
                for instrument_id in ids {
                    subscriptions.remove(instrument_id);
                }
            }
            None => subscriptions.clear(),
        }
        Ok(subscriptions.len())
    }

    pub fn subscribed_ids(&self, id: ConnectionId) -> Result<Vec<InstrumentId>, RegistryError> {
        Ok(self.entry(id)?.subscribed_ids())
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Point-in-time list of live connections
    pub fn connections(&self) -> Vec<Arc<ConnectionEntry>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn entry(&self, id: ConnectionId) -> Result<Arc<ConnectionEntry>, RegistryError> {
        self.get(id).ok_or(RegistryError::UnknownConnection(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registered(registry: &SubscriptionRegistry) -> (ConnectionId, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(4);
        let id = Uuid::new_v4();
        registry.register(id, tx);
        (id, rx)
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());

        let (id1, _rx1) = registered(&registry);
        let (id2, _rx2) = registered(&registry);
        assert_eq!(registry.len(), 2);
        assert!(registry.subscribed_ids(id1).unwrap().is_empty());

        assert!(registry.unregister(id1).is_some());
        assert!(registry.unregister(id1).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(id2).is_some());
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered(&registry);

        assert_eq!(registry.subscribe(id, [3, 1]).unwrap(), 2);
        assert_eq!(registry.subscribe(id, [1, 3, 2]).unwrap(), 3);
        assert_eq!(registry.subscribed_ids(id).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsubscribe_some_and_all() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered(&registry);
        registry.subscribe(id, [1, 2, 3]).unwrap();

        assert_eq!(registry.unsubscribe(id, Some(&[2, 42])).unwrap(), 2);
        assert_eq!(registry.subscribed_ids(id).unwrap(), vec![1, 3]);

        assert_eq!(registry.unsubscribe(id, None).unwrap(), 0);
        assert!(registry.subscribed_ids(id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_connection() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(
            registry.subscribe(id, [1]),
            Err(RegistryError::UnknownConnection(id))
        );
        assert!(registry.unsubscribe(id, None).is_err());
    }

    #[test]
    fn test_filter_keeps_only_subscribed_entries() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered(&registry);
        let entry = registry.get(id).unwrap();

        let entries = vec![
            ConsolidatedEntry::Tombstone { id: 1 },
            ConsolidatedEntry::Tombstone { id: 2 },
            ConsolidatedEntry::Tombstone { id: 3 },
        ];
        assert!(entry.filter(&entries).is_empty());

        registry.subscribe(id, [3, 1]).unwrap();
        let ids: Vec<_> = entry.filter(&entries).iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_try_send_reports_full_and_closed() {
        let registry = SubscriptionRegistry::new();
        let (tx, rx) = mpsc::channel(1);
        let entry = registry.register(Uuid::new_v4(), tx);

        entry.try_send(OutboundFrame::Text("a".into())).unwrap();
        assert!(matches!(
            entry.try_send(OutboundFrame::Text("b".into())),
            Err(TransportError::QueueFull)
        ));

        drop(rx);
        assert!(matches!(
            entry.try_send(OutboundFrame::Text("c".into())),
            Err(TransportError::ChannelClosed)
        ));
    }

    #[test]
    fn test_connections_snapshot_survives_unregister() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = registered(&registry);
        registry.subscribe(id, [5]).unwrap();

        let snapshot = registry.connections();
        registry.unregister(id);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_subscribed(5));
        assert!(registry.is_empty());
    }
}
