mod catalog_source;
mod connection;
mod event_publisher;

pub use catalog_source::CatalogSource;
pub use connection::{CloseEcho, ConnectionId, OutboundFrame};
pub use event_publisher::EventPublisher;
