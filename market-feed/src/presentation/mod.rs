pub mod websocket;

pub use websocket::{ConnectionSession, DispatchStats, Dispatcher, WsState, ws_handler};
