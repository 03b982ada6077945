mod registry;

pub use registry::{ConnectionEntry, SubscriptionRegistry};
