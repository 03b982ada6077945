//! Per-connection lifecycle and command handling
//!
//! Transport-agnostic: the session talks to its connection only through the
//! outbound queue registered with the subscription registry, so the same
//! state machine drives a real socket or a test channel.

use crate::application::ports::{CloseEcho, ConnectionId, OutboundFrame};
use crate::domain::Instrument;
use crate::error::{ProtocolError, TransportError};
use crate::infrastructure::{ConnectionEntry, InstrumentStore, SubscriptionRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::message::{ClientCommand, HandshakeEntry, encode};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// State of one subscriber connection
pub struct ConnectionSession {
    id: ConnectionId,
    state: SessionState,
    registry: Arc<SubscriptionRegistry>,
    store: Arc<InstrumentStore>,
    max_rows: usize,
    entry: Option<Arc<ConnectionEntry>>,
}

impl ConnectionSession {
    pub fn new(
        id: ConnectionId,
        registry: Arc<SubscriptionRegistry>,
        store: Arc<InstrumentStore>,
        max_rows: usize,
    ) -> Self {
        ConnectionSession {
            id,
            state: SessionState::Connecting,
            registry,
            store,
            max_rows,
            entry: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Register the connection and queue the handshake listing
    pub async fn open(
        &mut self,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TransportError> {
        let entry = self.registry.register(self.id, outbound);
        self.entry = Some(Arc::clone(&entry));
        self.state = SessionState::Open;

        tracing::info!(
            connection_id = %self.id,
            connections = self.registry.len(),
            "WebSocket connection opened"
        );

        let listing: Vec<HandshakeEntry> = self
            .store
            .snapshot(self.max_rows)
            .iter()
            .map(|instrument| HandshakeEntry::from(&instrument))
            .collect();
        entry.send(OutboundFrame::Text(encode(&listing)?)).await
    }

    /// Handle one inbound text message
    ///
    /// Protocol errors are logged and swallowed. Only a failure to queue a
    /// reply is returned, which ends the connection.
    pub async fn on_text(&mut self, text: &str) -> Result<(), TransportError> {
        match self.apply(text) {
            Ok(Some(ack)) => self.send(OutboundFrame::Text(encode(&ack)?)).await,
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.id,
                    error = %e,
                    payload = text,
                    "Ignoring client message"
                );
                Ok(())
            }
        }
    }

    /// Apply a command to the subscription set. Returns the acknowledgment
    /// for `subscribe`: every subscribed instrument currently in the store.
    pub fn apply(&self, text: &str) -> Result<Option<Vec<Instrument>>, ProtocolError> {
        match ClientCommand::parse(text)? {
            ClientCommand::Subscribe { product_ids } => {
                let subscribed = self.registry.subscribe(self.id, product_ids)?;
                let ack: Vec<Instrument> = self
                    .registry
                    .subscribed_ids(self.id)?
                    .into_iter()
                    .filter_map(|id| self.store.get(id))
                    .collect();
                tracing::info!(
                    connection_id = %self.id,
                    subscribed,
                    sent = ack.len(),
                    "Subscription snapshot sent"
                );
                Ok(Some(ack))
            }
            ClientCommand::Unsubscribe { product_ids } => {
                let remaining = self.registry.unsubscribe(self.id, product_ids.as_deref())?;
                tracing::debug!(connection_id = %self.id, remaining, "Unsubscribed");
                Ok(None)
            }
        }
    }

    /// Peer sent a close frame: echo its status, if it carried one
    pub async fn on_close(&mut self, echo: Option<CloseEcho>) {
        self.state = SessionState::Closing;
        if let Err(e) = self.send(OutboundFrame::Close(echo)).await {
            tracing::debug!(connection_id = %self.id, error = %e, "Close echo not queued");
        }
    }

    /// Unregister and release the outbound queue. Idempotent.
    pub fn close(&mut self) {
        match self.state {
            SessionState::Closed => return,
            SessionState::Connecting => {
                // Never registered
                self.state = SessionState::Closed;
                return;
            }
            SessionState::Open | SessionState::Closing => {}
        }
        self.state = SessionState::Closed;
        self.entry = None;
        self.registry.unregister(self.id);
        tracing::info!(
            connection_id = %self.id,
            connections = self.registry.len(),
            "WebSocket connection closed"
        );
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        match &self.entry {
            Some(entry) => entry.send(frame).await,
            None => Err(TransportError::ChannelClosed),
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        // Unwinding out of the command loop still releases the registration
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogItem, Quote};
    use chrono::Utc;
    use serde_json::Value;
    use uuid::Uuid;

    fn fixture() -> (Arc<SubscriptionRegistry>, Arc<InstrumentStore>) {
        let catalog = vec![
            CatalogItem::new(1, "A", "d1"),
            CatalogItem::new(2, "B", "d2"),
            CatalogItem::new(3, "C", "d3"),
        ];
        let now = Utc::now();
        let store = InstrumentStore::from_catalog(catalog, |item| {
            Instrument::new(item, Quote::new(item.id as u32, 1, 2, 3), now)
        });
        (Arc::new(SubscriptionRegistry::new()), Arc::new(store))
    }

    async fn opened(
        max_rows: usize,
    ) -> (
        ConnectionSession,
        mpsc::Receiver<OutboundFrame>,
        Arc<SubscriptionRegistry>,
        Arc<InstrumentStore>,
    ) {
        let (registry, store) = fixture();
        let (tx, rx) = mpsc::channel(8);
        let mut session = ConnectionSession::new(
            Uuid::new_v4(),
            Arc::clone(&registry),
            Arc::clone(&store),
            max_rows,
        );
        session.open(tx).await.unwrap();
        (session, rx, registry, store)
    }

    fn json(frame: OutboundFrame) -> Value {
        match frame {
            OutboundFrame::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("Expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_registers_and_sends_handshake() {
        let (session, mut rx, registry, _store) = opened(3).await;
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(registry.len(), 1);

        let handshake = json(rx.recv().await.unwrap());
        assert_eq!(
            handshake,
            serde_json::json!([
                {"id": 1, "name": "A-d1"},
                {"id": 2, "name": "B-d2"},
                {"id": 3, "name": "C-d3"}
            ])
        );
    }

    #[tokio::test]
    async fn test_handshake_is_capped_and_skips_empty_slots() {
        let (registry, store) = fixture();
        store.clear_slot(0).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = ConnectionSession::new(Uuid::new_v4(), registry, store, 1);
        session.open(tx).await.unwrap();

        let handshake = json(rx.recv().await.unwrap());
        assert_eq!(handshake, serde_json::json!([{"id": 2, "name": "B-d2"}]));
    }

    #[tokio::test]
    async fn test_subscribe_acknowledges_known_ids_only() {
        let (mut session, mut rx, registry, _store) = opened(3).await;
        rx.recv().await.unwrap();

        session
            .on_text(r#"{"type":"subscribe","product_ids":[3,99,1]}"#)
            .await
            .unwrap();

        let ack = json(rx.recv().await.unwrap());
        let ids: Vec<i64> = ack
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(ack[0]["bestBidPrice"], 1);

        // Unknown id stays recorded
        assert_eq!(registry.subscribed_ids(session.id()).unwrap(), vec![1, 3, 99]);
    }

    #[tokio::test]
    async fn test_ack_covers_whole_subscription_set() {
        let (mut session, mut rx, _registry, _store) = opened(3).await;
        rx.recv().await.unwrap();

        session
            .on_text(r#"{"type":"subscribe","product_ids":[2]}"#)
            .await
            .unwrap();
        rx.recv().await.unwrap();

        session
            .on_text(r#"{"type":"subscribe","product_ids":[3]}"#)
            .await
            .unwrap();
        let ack = json(rx.recv().await.unwrap());
        assert_eq!(ack.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_sends_nothing() {
        let (mut session, mut rx, registry, _store) = opened(3).await;
        rx.recv().await.unwrap();
        registry.subscribe(session.id(), [1, 2, 3]).unwrap();

        session
            .on_text(r#"{"type":"unsubscribe","product_ids":[2]}"#)
            .await
            .unwrap();
        assert_eq!(registry.subscribed_ids(session.id()).unwrap(), vec![1, 3]);

        session.on_text(r#"{"type":"unsubscribe"}"#).await.unwrap();
        assert!(registry.subscribed_ids(session.id()).unwrap().is_empty());

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bad_messages_keep_session_open() {
        let (mut session, mut rx, _registry, _store) = opened(3).await;
        rx.recv().await.unwrap();

        for text in ["garbage", r#"{"type":"bogus"}"#, r#"{"product_ids":[1]}"#, "{}"] {
            session.on_text(text).await.unwrap();
        }

        assert_eq!(session.state(), SessionState::Open);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_echo_and_unregister() {
        let (mut session, mut rx, registry, _store) = opened(3).await;
        rx.recv().await.unwrap();

        let echo = CloseEcho {
            code: 4000,
            reason: "done".to_string(),
        };
        session.on_close(Some(echo.clone())).await;
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(rx.recv().await.unwrap(), OutboundFrame::Close(Some(echo)));

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.is_empty());

        // Queue released once the session's handle is gone
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_without_status_queues_empty_echo() {
        let (mut session, mut rx, _registry, _store) = opened(3).await;
        rx.recv().await.unwrap();

        session.on_close(None).await;
        assert_eq!(rx.recv().await.unwrap(), OutboundFrame::Close(None));
    }

    #[tokio::test]
    async fn test_unopened_session_leaves_registry_alone() {
        let (open, _rx, registry, store) = opened(3).await;
        let mut unopened = ConnectionSession::new(open.id(), Arc::clone(&registry), store, 3);
        assert_eq!(unopened.state(), SessionState::Connecting);

        // Shares the id of a live connection; closing it must not unregister that one
        unopened.close();
        assert_eq!(unopened.state(), SessionState::Closed);
        drop(unopened);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(open.id()).is_some());
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let (session, _rx, registry, _store) = opened(3).await;
        assert_eq!(registry.len(), 1);
        drop(session);
        assert!(registry.is_empty());
    }
}
