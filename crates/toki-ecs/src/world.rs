//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator and every live [`Entity`] together with its components.
//!
//! Entities are kept in a `BTreeMap` keyed by [`EntityId`], so iteration order
//! is allocation order and therefore deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentSlot};
use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An identity plus an open set of components keyed by capability.
///
/// There is no inheritance: what an entity can do is decided purely by which
/// capability kinds it carries. At most one component per kind is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, S::Kind: Serialize",
    deserialize = "S: Deserialize<'de>, S::Kind: Deserialize<'de>"
))]
pub struct Entity<S: ComponentSlot> {
    id: EntityId,
    name: String,
    components: BTreeMap<S::Kind, S>,
}

impl<S: ComponentSlot> Entity<S> {
    /// Create an entity with no components.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            components: BTreeMap::new(),
        }
    }

    /// The entity's identifier.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a component, replacing any existing component of the same kind.
    ///
    /// Returns the replaced component, if any.
    pub fn add_component<T: Component<S>>(&mut self, component: T) -> Option<T> {
        self.components
            .insert(T::KIND, component.into_slot())
            .and_then(T::from_slot_owned)
    }

    /// Attach an already-wrapped slot value.
    pub fn add_slot(&mut self, slot: S) -> Option<S> {
        self.components.insert(slot.kind(), slot)
    }

    /// Borrow the component of type `T`, if attached.
    pub fn get_component<T: Component<S>>(&self) -> Option<&T> {
        self.components.get(&T::KIND).and_then(T::from_slot)
    }

    /// Mutably borrow the component of type `T`, if attached.
    pub fn get_component_mut<T: Component<S>>(&mut self) -> Option<&mut T> {
        self.components.get_mut(&T::KIND).and_then(T::from_slot_mut)
    }

    /// Detach and return the component of type `T`, if attached.
    pub fn remove_component<T: Component<S>>(&mut self) -> Option<T> {
        self.components
            .remove(&T::KIND)
            .and_then(T::from_slot_owned)
    }

    /// Whether a component of type `T` is attached.
    pub fn has_component<T: Component<S>>(&self) -> bool {
        self.components.contains_key(&T::KIND)
    }

    /// Capability kinds currently attached, in kind order.
    pub fn kinds(&self) -> impl Iterator<Item = S::Kind> + '_ {
        self.components.keys().copied()
    }
}

// ---------------------------------------------------------------------------
// ComponentBundle
// ---------------------------------------------------------------------------

/// A named set of components to spawn as one entity.
#[derive(Debug, Clone)]
pub struct ComponentBundle<S: ComponentSlot> {
    name: String,
    slots: Vec<S>,
}

impl<S: ComponentSlot> ComponentBundle<S> {
    /// Create an empty bundle for an entity called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
        }
    }

    /// Add a component to the bundle. Later components of the same kind
    /// replace earlier ones at spawn time.
    pub fn add<T: Component<S>>(&mut self, component: T) {
        self.slots.push(component.into_slot());
    }

    /// Builder-style [`add`](Self::add).
    pub fn with<T: Component<S>>(mut self, component: T) -> Self {
        self.add(component);
        self
    }

    /// The name the spawned entity will carry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of components in the bundle.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the bundle holds no components.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The entity pool.
#[derive(Debug, Clone)]
pub struct World<S: ComponentSlot> {
    pub(crate) allocator: EntityAllocator,
    pub(crate) entities: BTreeMap<EntityId, Entity<S>>,
}

impl<S: ComponentSlot> World<S> {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Spawn an entity from a bundle and return its fresh id.
    pub fn spawn_bundle(&mut self, bundle: ComponentBundle<S>) -> EntityId {
        let id = self.allocator.allocate();
        let mut entity = Entity::new(id, bundle.name);
        for slot in bundle.slots {
            entity.add_slot(slot);
        }
        self.entities.insert(id, entity);
        id
    }

    /// Despawn an entity, returning it with its components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive (already
    /// despawned or never allocated).
    pub fn despawn(&mut self, entity: EntityId) -> Result<Entity<S>, EcsError> {
        if !self.allocator.deallocate(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        self.entities
            .remove(&entity)
            .ok_or(EcsError::StaleEntity { entity })
    }

    /// Borrow an entity.
    pub fn get(&self, entity: EntityId) -> Option<&Entity<S>> {
        self.entities.get(&entity)
    }

    /// Mutably borrow an entity.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut Entity<S>> {
        self.entities.get_mut(&entity)
    }

    /// Borrow a component on an entity.
    pub fn get_component<T: Component<S>>(&self, entity: EntityId) -> Option<&T> {
        self.get(entity).and_then(Entity::get_component::<T>)
    }

    /// Mutably borrow a component on an entity.
    pub fn get_component_mut<T: Component<S>>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.get_mut(entity).and_then(Entity::get_component_mut::<T>)
    }

    /// Whether the entity is alive and carries a component of type `T`.
    pub fn has_component<T: Component<S>>(&self, entity: EntityId) -> bool {
        self.get(entity).is_some_and(Entity::has_component::<T>)
    }

    /// Insert or overwrite a component on a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn insert_component<T: Component<S>>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> Result<Option<T>, EcsError> {
        let target = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::StaleEntity { entity })?;
        Ok(target.add_component(component))
    }

    /// Remove a component from a live entity.
    ///
    /// Returns `Ok(None)` if the entity is alive but has no such component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn remove_component<T: Component<S>>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, EcsError> {
        let target = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::StaleEntity { entity })?;
        Ok(target.remove_component::<T>())
    }

    /// Whether the entity is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterate live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity<S>> {
        self.entities.values()
    }

    /// Ids of live entities in id order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }
}

impl<S: ComponentSlot> Default for World<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
