mod instrument_store;

pub use instrument_store::{InstrumentStore, Snapshot, SnapshotIter};
