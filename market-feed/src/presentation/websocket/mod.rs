mod dispatcher;
mod handler;
mod message;
mod session;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use handler::{WsState, ws_handler};
pub use message::{ClientCommand, HandshakeEntry, encode};
pub use session::{ConnectionSession, SessionState};
