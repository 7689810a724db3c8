use crate::fixed_array::{FixedArray, SizedArray};

/// Slot index of an entity held by a [`Pool`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolIndex(usize);

impl PoolIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Fixed set of `N` slots with index-based claim and release.
///
/// Slot contents stay where they were claimed, so a [`PoolIndex`] remains valid until it is
/// released. The slots live in a [`SizedArray`] that is filled with empty slots up front.
pub struct Pool<T, const N: usize> {
    slots: SizedArray<Option<T>, N>,
    used: usize,
}

impl<T, const N: usize> Pool<T, N> {
    pub fn new() -> Self {
        let mut slots = SizedArray::new();
        while slots.push(None).is_ok() {}
        Self { slots, used: 0 }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn is_full(&self) -> bool {
        self.used == N
    }

    /// Stores `value` in the first free slot. A full pool hands `value` back.
    pub fn claim(&mut self, value: T) -> Result<PoolIndex, T> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots.as_mut_slice()[index] = Some(value);
                self.used += 1;
                Ok(PoolIndex(index))
            }
            None => Err(value),
        }
    }

    pub fn release(&mut self, index: PoolIndex) -> Option<T> {
        let value = self.slots.as_mut_slice().get_mut(index.0)?.take();
        if value.is_some() {
            self.used -= 1;
        }
        value
    }

    /// Releases every entity matching `predicate`, passing each to `on_release`.
    pub fn release_where<P, R>(&mut self, mut predicate: P, mut on_release: R) -> usize
    where
        P: FnMut(&T) -> bool,
        R: FnMut(T),
    {
        let mut count = 0;
        for slot in self.slots.as_mut_slice().iter_mut() {
            if slot.as_ref().map_or(false, |value| predicate(value)) {
                if let Some(value) = slot.take() {
                    on_release(value);
                    count += 1;
                }
            }
        }
        self.used -= count;
        count
    }

    pub fn clear(&mut self) {
        for slot in self.slots.as_mut_slice().iter_mut() {
            *slot = None;
        }
        self.used = 0;
    }

    pub fn get(&self, index: PoolIndex) -> Option<&T> {
        self.slots.as_slice().get(index.0)?.as_ref()
    }

    pub fn get_mut(&mut self, index: PoolIndex) -> Option<&mut T> {
        self.slots.as_mut_slice().get_mut(index.0)?.as_mut()
    }

    pub fn find<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Option<PoolIndex> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().map_or(false, |value| predicate(value)))
            .map(PoolIndex)
    }

    pub fn find_value<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Option<&T> {
        self.iter().map(|(_, value)| value).find(|value| predicate(*value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (PoolIndex(index), value)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolIndex, &mut T)> {
        self.slots
            .as_mut_slice()
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (PoolIndex(index), value)))
    }
}

impl<T, const N: usize> Default for Pool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
