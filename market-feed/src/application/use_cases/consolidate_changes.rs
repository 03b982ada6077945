use crate::domain::{ChangeEvent, ConsolidatedEntry, Instrument, InstrumentId};
use std::collections::HashMap;

/// Reduces a tick's raw mutations to the entries worth sending
///
/// Keeps the last known value of every instrument it has seen. An update is
/// emitted when the instrument is new to the cache or one of its quote fields
/// moved; a deletion is emitted as a tombstone only when the cache knows the
/// identifier.
///
/// Deleted slots are looked up by slot position, not by catalog id. The two
/// coincide only when catalog ids equal catalog positions.
#[derive(Debug, Default)]
pub struct ChangeConsolidator {
    cache: HashMap<InstrumentId, Instrument>,
}

impl ChangeConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a pre-populated cache (the store's contents at startup)
    pub fn seeded(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        ChangeConsolidator {
            cache: instruments.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    /// Consolidate one tick. Updates come first, then tombstones.
    pub fn consolidate(&mut self, event: &ChangeEvent) -> Vec<ConsolidatedEntry> {
        let mut entries = Vec::with_capacity(event.updated.len() + event.deleted.len());

        for updated in &event.updated {
            let changed = match self.cache.get(&updated.id) {
                Some(cached) => cached.quote_differs(updated),
                None => true,
            };
            if changed {
                entries.push(ConsolidatedEntry::Update(updated.clone()));
            }
        }

        for &position in &event.deleted {
            let id = position as InstrumentId;
            if self.cache.remove(&id).is_some() {
                entries.push(ConsolidatedEntry::Tombstone { id });
            }
        }

        // Suppressed updates still refresh the cache
        for updated in &event.updated {
            self.cache.insert(updated.id, updated.clone());
        }

        entries
    }

    /// Last cached value for an instrument
    pub fn cached(&self, id: InstrumentId) -> Option<&Instrument> {
        self.cache.get(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
