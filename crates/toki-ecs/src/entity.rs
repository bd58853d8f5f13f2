//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a 32-bit handle handed out by an [`EntityAllocator`].
//! Indices are strictly increasing and are never recycled, so an id that once
//! referred to a despawned entity can never alias a newer one within the same
//! world.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A never-reused entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Construct an `EntityId` from a raw index.
    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The allocation index.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw `u32`.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates [`EntityId`]s and tracks which of them are still alive.
///
/// Unlike a generational allocator, indices are never handed out twice.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    /// Whether the slot is currently alive, indexed by `EntityId::index`.
    alive: Vec<bool>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self { alive: Vec::new() }
    }

    /// Allocate a fresh [`EntityId`].
    pub fn allocate(&mut self) -> EntityId {
        let index = self.alive.len() as u32;
        self.alive.push(true);
        EntityId::new(index)
    }

    /// Deallocate (despawn) an entity.
    ///
    /// Returns `true` if the entity was alive and is now despawned,
    /// `false` if it was already dead or was never allocated.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        match self.alive.get_mut(id.index() as usize) {
            Some(slot) if *slot => {
                *slot = false;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `id` refers to a currently alive entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.index() as usize).copied().unwrap_or(false)
    }

    /// Total number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Number of ids handed out so far (alive or not).
    pub fn allocated_count(&self) -> usize {
        self.alive.len()
    }

    /// Capture the allocator state for snapshot/restore.
    pub fn snapshot_state(&self) -> Vec<bool> {
        self.alive.clone()
    }

    /// Restore allocator state from a previously captured snapshot.
    pub fn restore_from_snapshot(alive: Vec<bool>) -> Self {
        Self { alive }
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_count_up_from_zero() {
        let mut allocator = EntityAllocator::new();
        let first: Vec<u32> = (0..5).map(|_| allocator.allocate().index()).collect();
        assert_eq!(first, vec![0, 1, 2, 3, 4]);
        assert_eq!(allocator.allocated_count(), 5);
    }

    #[test]
    fn despawned_slot_is_skipped_not_reused() {
        let mut allocator = EntityAllocator::new();
        let hero = allocator.allocate();
        assert!(allocator.deallocate(hero));
        let slime = allocator.allocate();
        assert_eq!(slime.index(), hero.index() + 1);
        assert!(!allocator.is_alive(hero));
        assert!(allocator.is_alive(slime));
        assert!(!allocator.deallocate(hero), "second despawn is a no-op");
    }

    #[test]
    fn liveness_of_never_issued_ids() {
        let allocator = EntityAllocator::new();
        assert!(!allocator.is_alive(EntityId::new(7)));
        assert_eq!(allocator.alive_count(), 0);
    }

    #[test]
    fn restored_allocator_continues_after_the_last_issued_id() {
        let mut allocator = EntityAllocator::new();
        let ids: Vec<EntityId> = (0..3).map(|_| allocator.allocate()).collect();
        allocator.deallocate(ids[1]);

        let mut restored = EntityAllocator::restore_from_snapshot(allocator.snapshot_state());
        assert_eq!(restored.alive_count(), 2);
        assert!(!restored.is_alive(ids[1]));
        assert_eq!(restored.allocate(), EntityId::new(3));
    }
}
