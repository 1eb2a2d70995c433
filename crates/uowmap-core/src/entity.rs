//! Entity model and snapshot-based dirty checking
//!
//! An entity never tracks its own mutations. Instead it can produce a
//! snapshot of its persistable fields on demand, and keeps a `Baseline`:
//! the snapshot taken when it was last loaded or saved. Comparing the two
//! answers "has this entity unsaved changes?".

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use uowmap_core_types::EntityId;

/// Handle to an entity instance owned jointly by the caller and a session.
///
/// The identity map hands out clones of the same handle, so two lookups of
/// one identity observe the same instance (`Rc::ptr_eq`).
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap an entity into a `Shared` handle
pub fn share<T>(entity: T) -> Shared<T> {
    Rc::new(RefCell::new(entity))
}

/// A tracked domain object
///
/// Implementors hold a `Baseline` of their own snapshot type and expose it
/// through `baseline`/`baseline_mut`; dirty checking is provided.
///
/// # Example
///
/// ```
/// use uowmap_core::{Baseline, Entity, EntityId};
///
/// struct Tag {
///     id: EntityId,
///     label: String,
///     baseline: Baseline<(EntityId, String)>,
/// }
///
/// impl Entity for Tag {
///     type Snapshot = (EntityId, String);
///
///     fn id(&self) -> EntityId {
///         self.id
///     }
///     fn current_snapshot(&self) -> Self::Snapshot {
///         (self.id, self.label.clone())
///     }
///     fn baseline(&self) -> &Baseline<Self::Snapshot> {
///         &self.baseline
///     }
///     fn baseline_mut(&mut self) -> &mut Baseline<Self::Snapshot> {
///         &mut self.baseline
///     }
/// }
///
/// let mut tag = Tag { id: EntityId::new(), label: "a".into(), baseline: Baseline::empty() };
/// assert!(tag.has_changes());
/// tag.mark_clean();
/// assert!(!tag.has_changes());
/// tag.label = "b".into();
/// assert!(tag.has_changes());
/// ```
pub trait Entity: 'static {
    /// Immutable capture of the persistable fields, compared structurally
    type Snapshot: Clone + PartialEq + fmt::Debug;

    /// Identity assigned at creation; must never change
    fn id(&self) -> EntityId;

    /// Snapshot of the current field values. Must be pure.
    fn current_snapshot(&self) -> Self::Snapshot;

    fn baseline(&self) -> &Baseline<Self::Snapshot>;

    fn baseline_mut(&mut self) -> &mut Baseline<Self::Snapshot>;

    /// True when there is no baseline, or the current snapshot differs from it
    fn has_changes(&self) -> bool {
        self.baseline().differs_from(&self.current_snapshot())
    }

    /// Take the current snapshot as the new baseline
    fn mark_clean(&mut self) {
        let snapshot = self.current_snapshot();
        self.baseline_mut().reset(snapshot);
    }
}

/// The snapshot an entity had when it was last loaded, inserted or committed
///
/// An empty baseline means the entity never had one and is always dirty.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline<S>(Option<S>);

impl<S> Baseline<S> {
    /// No baseline: the entity reports changes until one is captured
    pub const fn empty() -> Self {
        Self(None)
    }

    pub const fn captured(snapshot: S) -> Self {
        Self(Some(snapshot))
    }

    pub fn get(&self) -> Option<&S> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn reset(&mut self, snapshot: S) {
        self.0 = Some(snapshot);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl<S: PartialEq> Baseline<S> {
    /// Compare a current snapshot against the baseline
    pub fn differs_from(&self, current: &S) -> bool {
        match &self.0 {
            None => true,
            Some(original) => original != current,
        }
    }
}

impl<S> Default for Baseline<S> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Static type tag of an entity type, used to resolve its mapper
#[derive(Clone, Copy)]
pub struct EntityKind {
    type_id: TypeId,
    name: &'static str,
}

impl EntityKind {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for EntityKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityKind {}

impl std::hash::Hash for EntityKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityKind").field(&self.name).finish()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
