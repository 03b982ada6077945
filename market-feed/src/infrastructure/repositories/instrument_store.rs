use crate::domain::{CatalogItem, Instrument, InstrumentId, SlotPosition};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Fixed-capacity slot array holding the live instrument catalog
///
/// Slot `i` is populated from catalog entry `i` and keeps that position for
/// the process lifetime. A slot is either occupied or empty; an emptied slot
/// can be repopulated from its catalog template.
///
/// Each slot sits behind its own lock. The generator is the only writer;
/// readers copy instruments out one slot at a time, so a snapshot taken
/// during a tick may mix pre- and post-tick slots.
pub struct InstrumentStore {
    slots: Vec<RwLock<Option<Instrument>>>,
    templates: Vec<CatalogItem>,
    index: HashMap<InstrumentId, SlotPosition>,
}

impl InstrumentStore {
    /// Build the store from the catalog, creating each initial instrument
    /// with `create`. Catalog order becomes slot order.
    pub fn from_catalog(
        catalog: Vec<CatalogItem>,
        mut create: impl FnMut(&CatalogItem) -> Instrument,
    ) -> Self {
        let slots = catalog
            .iter()
            .map(|item| RwLock::new(Some(create(item))))
            .collect();

        let mut index = HashMap::with_capacity(catalog.len());
        for (position, item) in catalog.iter().enumerate() {
            index.entry(item.id).or_insert(position);
        }

        InstrumentStore {
            slots,
            templates: catalog,
            index,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.read().is_some()).count()
    }

    /// Up to `limit` occupied instruments, scanned from slot 0
    pub fn snapshot(&self, limit: usize) -> Snapshot<'_> {
        Snapshot { store: self, limit }
    }

    /// Copy of the instrument with catalog id `id`, if its slot is occupied
    pub fn get(&self, id: InstrumentId) -> Option<Instrument> {
        let position = *self.index.get(&id)?;
        self.slots[position]
            .read()
            .as_ref()
            .filter(|instrument| instrument.id == id)
            .cloned()
    }

    /// Original catalog entry for a slot
    pub fn template(&self, position: SlotPosition) -> Option<&CatalogItem> {
        self.templates.get(position)
    }

    /// Copy of a slot's current content
    pub fn slot(&self, position: SlotPosition) -> Result<Option<Instrument>, StoreError> {
        Ok(self.slot_lock(position)?.read().clone())
    }

    pub fn set_slot(
        &self,
        position: SlotPosition,
        instrument: Instrument,
    ) -> Result<(), StoreError> {
        *self.slot_lock(position)?.write() = Some(instrument);
        Ok(())
    }

    pub fn clear_slot(
        &self,
        position: SlotPosition,
    ) -> Result<Option<Instrument>, StoreError> {
        Ok(self.slot_lock(position)?.write().take())
    }

    fn slot_lock(
        &self,
        position: SlotPosition,
    ) -> Result<&RwLock<Option<Instrument>>, StoreError> {
        self.slots.get(position).ok_or(StoreError::SlotOutOfRange {
            position,
            capacity: self.slots.len(),
        })
    }
}

/// Lazy, restartable view over the occupied slots of a store
///
/// Nothing is read until iteration. Every iteration starts again from slot 0
/// and observes the store as it is at that moment.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    store: &'a InstrumentStore,
    limit: usize,
}

impl<'a> Snapshot<'a> {
    pub fn iter(&self) -> SnapshotIter<'a> {
        SnapshotIter {
            store: self.store,
            position: 0,
            remaining: self.limit,
        }
    }
}

impl<'a> IntoIterator for Snapshot<'a> {
    type Item = Instrument;
    type IntoIter = SnapshotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Snapshot<'a> {
    type Item = Instrument;
    type IntoIter = SnapshotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SnapshotIter<'a> {
    store: &'a InstrumentStore,
    position: SlotPosition,
    remaining: usize,
}

impl Iterator for SnapshotIter<'_> {
    type Item = Instrument;

    fn next(&mut self) -> Option<Instrument> {
        while self.remaining > 0 && self.position < self.store.slots.len() {
            let slot = self.store.slots[self.position].read().clone();
            self.position += 1;
            if let Some(instrument) = slot {
                self.remaining -= 1;
                return Some(instrument);
            }
        }
        None
    }
}
