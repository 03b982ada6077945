pub mod entities;
pub mod events;
pub mod services;
pub mod value_objects;

pub use entities::{CatalogItem, Instrument, Quote};
pub use events::{ChangeEvent, ConsolidatedEntry};
pub use services::Clock;
pub use value_objects::{InstrumentId, SlotPosition, Timestamp};
