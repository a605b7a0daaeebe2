//! Per-run slot binding table.

use std::collections::HashMap;

use hashpipe_core::id::SlotId;

/// Slot id to byte buffer. Each slot is bound at most once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    slots: HashMap<SlotId, Vec<u8>>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Bindings {
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Binds `slot`. Returns `false`, leaving the old value, if it was
    /// already bound.
    pub fn bind(&mut self, slot: SlotId, value: Vec<u8>) -> bool {
        match self.slots.entry(slot) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&[u8]> {
        self.slots.get(&slot).map(Vec::as_slice)
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.slots.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops all values, keeping the allocation for the next run.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Bound slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &[u8])> + '_ {
        let mut slots: Vec<SlotId> = self.slots.keys().copied().collect();
        slots.sort_unstable();
        slots
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|value| (slot, value)))
    }
}
