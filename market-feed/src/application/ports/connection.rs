use uuid::Uuid;

/// Identifier of one live WebSocket connection
pub type ConnectionId = Uuid;

/// Status carried by a peer's close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEcho {
    pub code: u16,
    pub reason: String,
}

/// A frame queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Serialized JSON payload
    Text(String),
    /// Complete the close handshake started by the peer. The reply repeats
    /// the peer's status, or is empty when the peer sent none.
    Close(Option<CloseEcho>),
}
