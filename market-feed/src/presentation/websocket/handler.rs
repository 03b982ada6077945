use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::ports::{CloseEcho, OutboundFrame};
use crate::error::TransportError;
use crate::infrastructure::{InstrumentStore, SubscriptionRegistry};

use super::session::ConnectionSession;

/// WebSocket connection state
pub struct WsState {
    pub registry: Arc<SubscriptionRegistry>,
    pub store: Arc<InstrumentStore>,
    pub max_rows: usize,
    pub outbound_capacity: usize,
}

/// Handle WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (sender, receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<OutboundFrame>(state.outbound_capacity.max(1));

    let mut session = ConnectionSession::new(
        Uuid::new_v4(),
        Arc::clone(&state.registry),
        Arc::clone(&state.store),
        state.max_rows,
    );

    let connection_id = session.id();
    let mut writer = tokio::spawn(write_frames(sender, rx, connection_id));

    tokio::select! {
        result = run_session(&mut session, receiver, tx) => {
            if let Err(e) = result {
                tracing::warn!(%connection_id, error = %e, "Connection failed");
            }
        }
        _ = &mut writer => {
            tracing::debug!(%connection_id, "Writer stopped");
        }
    }

    // Drops the registry's sender so the writer drains and exits
    session.close();
    if !writer.is_finished() {
        let _ = writer.await;
    }
}

/// Reader side: handshake, then one command at a time until close
async fn run_session(
    session: &mut ConnectionSession,
    mut receiver: SplitStream<WebSocket>,
    outbound: mpsc::Sender<OutboundFrame>,
) -> Result<(), TransportError> {
    session.open(outbound).await?;

    while let Some(msg) = receiver.next().await {
        let msg = msg.map_err(|e| TransportError::Receive(e.to_string()))?;
        match msg {
            Message::Text(text) => session.on_text(text.as_str()).await?,
            Message::Close(frame) => {
                let echo = frame.map(|frame| CloseEcho {
                    code: frame.code,
                    reason: frame.reason.as_str().to_owned(),
                });
                tracing::debug!(connection_id = %session.id(), ?echo, "Peer closed");
                session.on_close(echo).await;
                break;
            }
            // Binary payloads are ignored; pings are answered by the transport
            _ => {}
        }
    }

    Ok(())
}

/// Writer side: the only task that touches the socket sink
///
/// When the peer closes, the transport has already queued a reply carrying
/// the peer's status (or an empty one). The writer must not send a second
/// close frame; closing the sink flushes that reply and ends the handshake.
async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundFrame>,
    connection_id: Uuid,
) {
    while let Some(frame) = rx.recv().await {
        match frame {
            OutboundFrame::Text(text) => {
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    tracing::debug!(%connection_id, error = %e, "Socket write failed");
                    break;
                }
            }
            OutboundFrame::Close(echo) => {
                tracing::debug!(%connection_id, ?echo, "Completing close handshake");
                break;
            }
        }
    }

    if let Err(e) = sender.close().await {
        tracing::debug!(%connection_id, error = %e, "Socket close failed");
    }
}
