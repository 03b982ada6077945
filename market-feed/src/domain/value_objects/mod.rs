use chrono::{DateTime, Utc};

/// Catalog-assigned instrument identifier. Stable for the process lifetime.
pub type InstrumentId = i64;

/// Position of a slot in the instrument store.
pub type SlotPosition = usize;

/// UTC timestamp of the last mutation.
pub type Timestamp = DateTime<Utc>;
