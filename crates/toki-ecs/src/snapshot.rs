//! World snapshot and restore support.
//!
//! Provides [`WorldSnapshot`] -- a fully serializable representation of the
//! ECS world state that can be captured, serialized to JSON, and used to
//! restore the world to an exact previous state (including entity IDs,
//! allocator state and all component data).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentSlot;
use crate::entity::EntityAllocator;
use crate::world::{Entity, World};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A complete, serializable snapshot of the ECS world state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, S::Kind: Serialize",
    deserialize = "S: Deserialize<'de>, S::Kind: Deserialize<'de>"
))]
pub struct WorldSnapshot<S: ComponentSlot> {
    /// Per-index alive flags of the allocator.
    pub alive: Vec<bool>,
    /// All alive entities, sorted by id.
    pub entities: Vec<Entity<S>>,
}

// ---------------------------------------------------------------------------
// World snapshot/restore impl
// ---------------------------------------------------------------------------

impl<S: ComponentSlot> World<S> {
    /// Capture a complete snapshot of the world state.
    pub fn capture_snapshot(&self) -> WorldSnapshot<S> {
        WorldSnapshot {
            alive: self.allocator.snapshot_state(),
            entities: self.entities.values().cloned().collect(),
        }
    }

    /// Restore the world state from a previously captured snapshot.
    ///
    /// The snapshot is validated before anything is touched, so a rejected
    /// snapshot leaves the world unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InconsistentSnapshot`] if an entity in the snapshot
    /// is not marked alive in the allocator state, appears twice, or if the
    /// number of alive flags does not match the number of entities.
    pub fn restore_from_snapshot(&mut self, snapshot: &WorldSnapshot<S>) -> Result<(), EcsError> {
        let mut entities = BTreeMap::new();
        for entity in &snapshot.entities {
            let idx = entity.id().index() as usize;
            if !snapshot.alive.get(idx).copied().unwrap_or(false) {
                return Err(EcsError::InconsistentSnapshot {
                    details: format!("entity {} is not alive in allocator state", entity.id()),
                });
            }
            if entities.insert(entity.id(), entity.clone()).is_some() {
                return Err(EcsError::InconsistentSnapshot {
                    details: format!("entity {} appears more than once", entity.id()),
                });
            }
        }

        let alive_count = snapshot.alive.iter().filter(|&&a| a).count();
        if alive_count != entities.len() {
            tracing::warn!(
                alive_count,
                entity_count = entities.len(),
                "snapshot allocator and entity list disagree"
            );
            return Err(EcsError::InconsistentSnapshot {
                details: format!(
                    "{alive_count} alive flags but {} entities",
                    entities.len()
                ),
            });
        }

        self.allocator = EntityAllocator::restore_from_snapshot(snapshot.alive.clone());
        self.entities = entities;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
