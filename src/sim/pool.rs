//! Reusable-instance pool keyed by archetype
//!
//! Instances live in a slab that only ever grows. Each slot carries the
//! archetype tag it was built for, so a release always returns the instance
//! to its own bucket. A slot is either live or queued in exactly one free
//! bucket, never both.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::rank::RankId;
use crate::error::CoreError;

/// Handle to a pooled slot. Stays valid across activations of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolKey(pub u32);

impl PoolKey {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    archetype: RankId,
    live: bool,
    value: T,
}

/// Pool of `T` with one FIFO free queue per archetype
#[derive(Debug)]
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<VecDeque<u32>>,
    live: usize,
}

impl<T> ObjectPool<T> {
    /// Create a pool with buckets for `archetypes` archetypes
    pub fn new(archetypes: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: (0..archetypes).map(|_| VecDeque::new()).collect(),
            live: 0,
        }
    }

    fn bucket(&mut self, archetype: RankId) -> &mut VecDeque<u32> {
        let idx = archetype.index();
        if idx >= self.free.len() {
            self.free.resize_with(idx + 1, VecDeque::new);
        }
        &mut self.free[idx]
    }

    /// Take an instance of `archetype` out of its free queue, or build a
    /// fresh one with `make` when the queue is empty.
    ///
    /// Returns the key and whether the instance was freshly constructed.
    pub fn acquire_with(
        &mut self,
        archetype: RankId,
        make: impl FnOnce(PoolKey) -> T,
    ) -> (PoolKey, bool) {
        if let Some(index) = self.bucket(archetype).pop_front() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(!slot.live, "free queue held a live slot");
            slot.live = true;
            self.live += 1;
            return (PoolKey(index), false);
        }

        let key = PoolKey(self.slots.len() as u32);
        let value = make(key);
        self.slots.push(Slot {
            archetype,
            live: true,
            value,
        });
        self.live += 1;
        (key, true)
    }

    /// Build an inactive instance straight into the free queue (warm-up)
    pub fn insert_free(&mut self, archetype: RankId, make: impl FnOnce(PoolKey) -> T) -> PoolKey {
        let key = PoolKey(self.slots.len() as u32);
        let value = make(key);
        self.slots.push(Slot {
            archetype,
            live: false,
            value,
        });
        self.bucket(archetype).push_back(key.0);
        key
    }

    /// Return a live instance to the bucket of the archetype it was built for
    pub fn release(&mut self, key: PoolKey) -> Result<RankId, CoreError> {
        let slot = self
            .slots
            .get_mut(key.index())
            .filter(|s| s.live)
            .ok_or(CoreError::NotLive(key))?;
        slot.live = false;
        let archetype = slot.archetype;
        self.live -= 1;
        self.bucket(archetype).push_back(key.0);
        Ok(archetype)
    }

    #[inline]
    pub fn is_live(&self, key: PoolKey) -> bool {
        self.slots.get(key.index()).is_some_and(|s| s.live)
    }

    /// Live instance for `key`
    #[inline]
    pub fn get(&self, key: PoolKey) -> Option<&T> {
        self.slots
            .get(key.index())
            .filter(|s| s.live)
            .map(|s| &s.value)
    }

    #[inline]
    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index())
            .filter(|s| s.live)
            .map(|s| &mut s.value)
    }

    pub fn archetype_of(&self, key: PoolKey) -> Option<RankId> {
        self.slots.get(key.index()).map(|s| s.archetype)
    }

    /// Live instances in slot order
    pub fn iter_live(&self) -> impl Iterator<Item = (PoolKey, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| (PoolKey(i as u32), &s.value))
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = (PoolKey, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| (PoolKey(i as u32), &mut s.value))
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Every instance ever built (live + free)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self, archetype: RankId) -> usize {
        self.free.get(archetype.index()).map_or(0, VecDeque::len)
    }

    pub fn live_count_of(&self, archetype: RankId) -> usize {
        self.slots
            .iter()
            .filter(|s| s.live && s.archetype == archetype)
            .count()
    }

    /// Instances built for `archetype` (free + live)
    pub fn total_of(&self, archetype: RankId) -> usize {
        self.slots.iter().filter(|s| s.archetype == archetype).count()
    }
}
