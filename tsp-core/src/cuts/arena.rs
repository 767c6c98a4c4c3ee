//! Reference-counted interning arena shared by the clique and tooth banks.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    refs: usize,
}

/// Slots addressed by stable indices, deduplicated through a hash index.
///
/// A freed slot index may be handed out again by a later `intern`.
#[derive(Debug, Clone)]
pub(crate) struct InternArena<T: Clone + Eq + Hash> {
    slots: Vec<Option<Slot<T>>>,
    index: HashMap<T, usize>,
    free: Vec<usize>,
}

impl<T: Clone + Eq + Hash> Default for InternArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> InternArena<T> {
    /// Intern `value`, taking one reference.
    ///
    /// Returns the slot index and whether the value was new.
    pub fn intern(&mut self, value: T) -> (usize, bool) {
        if let Some(&idx) = self.index.get(&value) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.refs += 1;
            }
            return (idx, false);
        }

        let slot = Slot {
            value: value.clone(),
            refs: 1,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(value, idx);
        (idx, true)
    }

    /// Take another reference. Returns false if the slot is dead.
    pub fn retain(&mut self, idx: usize) -> bool {
        match self.slots.get_mut(idx).and_then(Option::as_mut) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one reference. Returns `None` if the slot is dead, otherwise
    /// whether this call freed it.
    pub fn release(&mut self, idx: usize) -> Option<bool> {
        let slot = self.slots.get_mut(idx)?.as_mut()?;
        slot.refs -= 1;
        if slot.refs > 0 {
            return Some(false);
        }
        if let Some(dead) = self.slots[idx].take() {
            self.index.remove(&dead.value);
        }
        self.free.push(idx);
        Some(true)
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)?.as_ref().map(|s| &s.value)
    }

    pub fn refcount(&self, idx: usize) -> usize {
        self.slots
            .get(idx)
            .and_then(Option::as_ref)
            .map_or(0, |s| s.refs)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.index.len()
    }
}
