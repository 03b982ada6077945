use crate::domain::entities::Instrument;
use crate::domain::value_objects::{InstrumentId, SlotPosition};
use serde::{Deserialize, Serialize};

/// Raw mutations produced by one generator tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Tick sequence number, starting at 1
    pub tick: u64,
    /// Instruments inserted or requoted this tick, in slot order
    pub updated: Vec<Instrument>,
    /// Slot positions emptied this tick
    pub deleted: Vec<SlotPosition>,
}

impl ChangeEvent {
    pub fn new(tick: u64, updated: Vec<Instrument>, deleted: Vec<SlotPosition>) -> Self {
        ChangeEvent {
            tick,
            updated,
            deleted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// One wire-worthy change: a full instrument record or a tombstone `{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsolidatedEntry {
    Update(Instrument),
    Tombstone { id: InstrumentId },
}

impl ConsolidatedEntry {
    pub fn id(&self) -> InstrumentId {
        match self {
            ConsolidatedEntry::Update(instrument) => instrument.id,
            ConsolidatedEntry::Tombstone { id } => *id,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, ConsolidatedEntry::Tombstone { .. })
    }
}
