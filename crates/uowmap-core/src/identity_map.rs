//! Type-erased identity sets
//!
//! The unit of work keeps entities of many types in one map keyed by
//! identity. Each slot owns a clone of the caller's `Shared<T>` handle, so
//! lookups hand back the very same instance.

use crate::entity::{Entity, EntityKind, Shared};
use crate::errors::{Result, UowError};
use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;
use uowmap_core_types::EntityId;

/// Object-safe view of a `Shared<T>` handle
pub(crate) trait TrackedEntity {
    fn kind(&self) -> EntityKind;

    /// Dirty check; a mutably borrowed entity counts as changed
    fn has_changes(&self) -> bool;

    /// True when the caller currently holds any borrow of the entity
    fn is_borrowed(&self) -> bool;

    /// The `Shared<T>` handle, for typed downcasts
    fn handle(&self) -> &dyn Any;

    /// Run `f` against the borrowed entity
    fn with_entity(&self, f: &mut dyn FnMut(&dyn Any) -> Result<()>) -> Result<()>;

    fn mark_clean(&self);
}

struct Tracked<T: Entity> {
    id: EntityId,
    handle: Shared<T>,
}

impl<T: Entity> TrackedEntity for Tracked<T> {
    fn kind(&self) -> EntityKind {
        EntityKind::of::<T>()
    }

    fn has_changes(&self) -> bool {
        self.handle
            .try_borrow()
            .map(|entity| entity.has_changes())
            .unwrap_or(true)
    }

    fn is_borrowed(&self) -> bool {
        self.handle.try_borrow_mut().is_err()
    }

    fn handle(&self) -> &dyn Any {
        &self.handle
    }

    fn with_entity(&self, f: &mut dyn FnMut(&dyn Any) -> Result<()>) -> Result<()> {
        let entity = self
            .handle
            .try_borrow()
            .map_err(|_| UowError::EntityBorrowed { entity_id: self.id })?;
        f(&*entity)
    }

    fn mark_clean(&self) {
        if let Ok(mut entity) = self.handle.try_borrow_mut() {
            entity.mark_clean();
        }
    }
}

/// One identity-map entry
pub(crate) struct Slot {
    entity: Box<dyn TrackedEntity>,
    /// False only for entities registered as new and never written
    persisted: bool,
}

impl Slot {
    pub(crate) fn new<T: Entity>(id: EntityId, handle: Shared<T>, persisted: bool) -> Self {
        Self {
            entity: Box::new(Tracked { id, handle }),
            persisted,
        }
    }

    pub(crate) fn entity(&self) -> &dyn TrackedEntity {
        self.entity.as_ref()
    }

    pub(crate) fn persisted(&self) -> bool {
        self.persisted
    }

    /// The handle as `Shared<T>`, or `None` when the slot holds another type
    pub(crate) fn downcast<T: Entity>(&self) -> Option<Shared<T>> {
        self.entity.handle().downcast_ref::<Shared<T>>().cloned()
    }

    pub(crate) fn holds_instance<T: Entity>(&self, handle: &Shared<T>) -> bool {
        self.downcast::<T>()
            .is_some_and(|own| Rc::ptr_eq(&own, handle))
    }
}

/// Entities of any type keyed by identity, iterated in identity order
#[derive(Default)]
pub(crate) struct IdentitySet {
    slots: BTreeMap<EntityId, Slot>,
}

impl IdentitySet {
    pub(crate) fn insert(&mut self, id: EntityId, slot: Slot) {
        self.slots.insert(id, slot);
    }

    pub(crate) fn remove(&mut self, id: &EntityId) -> Option<Slot> {
        self.slots.remove(id)
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<&Slot> {
        self.slots.get(id)
    }

    pub(crate) fn contains(&self, id: &EntityId) -> bool {
        self.slots.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&EntityId, &Slot)> {
        self.slots.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
