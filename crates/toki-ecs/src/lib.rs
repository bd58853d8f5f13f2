//! Toki ECS -- capability-keyed entity/component store.
//!
//! Entities carry an identity, a display name and an open set of components.
//! Components are stored by capability kind (one per kind) in a closed slot
//! enum declared with [`component_slot!`], so typed lookups never rely on
//! runtime reflection. Entity ids are handed out monotonically and are never
//! reused within a [`World`](world::World).
//!
//! # Quick Start
//!
//! ```
//! use toki_ecs::component_slot;
//! use toki_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! pub struct Health(u32);
//!
//! component_slot! {
//!     pub enum Slot keyed by Kind {
//!         Health(Health),
//!     }
//! }
//!
//! let mut world: World<Slot> = World::new();
//! let slime = world.spawn_bundle(ComponentBundle::new("slime").with(Health(12)));
//!
//! assert_eq!(world.get_component::<Health>(slime), Some(&Health(12)));
//! world.despawn(slime).unwrap();
//! assert!(!world.is_alive(slime));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod snapshot;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (despawned or never allocated).
    #[error("entity {entity:?} does not exist (despawned or never allocated)")]
    StaleEntity {
        entity: entity::EntityId,
    },

    /// A snapshot failed validation during restore.
    #[error("inconsistent world snapshot: {details}")]
    InconsistentSnapshot {
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentSlot};
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::world::{ComponentBundle, Entity, World};
    pub use crate::EcsError;
}
