//! Identifiers for host entities and a simple allocator.

use serde::{Deserialize, Serialize};

/// Stable handle for one host-scene object (text root or fragment).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Monotonic allocator for EntityId.
/// Ids are never reused, so a stale id can only ever resolve to "not alive".
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_entity: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
