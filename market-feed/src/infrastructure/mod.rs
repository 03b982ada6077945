pub mod catalog;
pub mod clock;
pub mod config;
pub mod event_publisher;
pub mod generator;
pub mod repositories;
pub mod subscriptions;

pub use catalog::JsonFileCatalog;
pub use clock::SimulationClock;
pub use config::{FeedConfig, ServerConfig};
pub use event_publisher::BroadcastEventPublisher;
pub use generator::{ChangeGenerator, GeneratorConfig, random_quote};
pub use repositories::{InstrumentStore, Snapshot, SnapshotIter};
pub use subscriptions::{ConnectionEntry, SubscriptionRegistry};
