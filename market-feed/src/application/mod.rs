pub mod ports;
pub mod use_cases;

pub use ports::{CatalogSource, CloseEcho, ConnectionId, EventPublisher, OutboundFrame};
pub use use_cases::ChangeConsolidator;
