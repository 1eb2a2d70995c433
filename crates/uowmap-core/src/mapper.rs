//! Entity mapper capability and the registry that resolves it
//!
//! A mapper translates one entity type to and from its persisted form. The
//! unit of work works on type-erased entities, so each registered mapper is
//! stored behind an object-safe adapter that downcasts to the mapper's own
//! entity type.

use crate::entity::{Entity, EntityKind};
use crate::errors::{Result, UowError};
use crate::provider::{ConnectionProvider, Transaction};
use std::any::{type_name, Any};
use uowmap_core_types::EntityId;

/// Persistence mapping for one entity type
///
/// `fetch` must return an entity whose baseline equals the fetched fields,
/// so it reports no changes right after loading.
pub trait EntityMapper<P: ConnectionProvider> {
    type Entity: Entity;

    /// Write a new row; the identity is assumed not to exist yet
    fn insert(&self, tx: &Transaction<'_, P>, entity: &Self::Entity) -> Result<()>;

    /// Write current field values to the row with the entity's identity.
    /// Zero affected rows is not an error.
    fn update(&self, tx: &Transaction<'_, P>, entity: &Self::Entity) -> Result<()>;

    /// Remove the row with the entity's identity, if any
    fn delete(&self, tx: &Transaction<'_, P>, entity: &Self::Entity) -> Result<()>;

    /// Load the entity with `id`, or `None` when no row matches
    fn fetch(&self, id: EntityId, conn: &P::Connection) -> Result<Option<Self::Entity>>;

    fn handles(&self, kind: EntityKind) -> bool {
        kind == EntityKind::of::<Self::Entity>()
    }

    /// Name used in diagnostics
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Object-safe view of an `EntityMapper`
pub(crate) trait ErasedMapper<P: ConnectionProvider> {
    fn name(&self) -> &'static str;
    fn handles(&self, kind: EntityKind) -> bool;
    fn insert_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()>;
    fn update_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()>;
    fn delete_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()>;
    fn fetch_any(&self, id: EntityId, conn: &P::Connection) -> Result<Option<Box<dyn Any>>>;
}

impl<P, M> ErasedMapper<P> for M
where
    P: ConnectionProvider,
    M: EntityMapper<P>,
{
    fn name(&self) -> &'static str {
        <M as EntityMapper<P>>::name(self)
    }

    fn handles(&self, kind: EntityKind) -> bool {
        <M as EntityMapper<P>>::handles(self, kind)
    }

    fn insert_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()> {
        <M as EntityMapper<P>>::insert(self, tx, downcast::<P, M>(self, entity)?)
    }

    fn update_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()> {
        <M as EntityMapper<P>>::update(self, tx, downcast::<P, M>(self, entity)?)
    }

    fn delete_any(&self, tx: &Transaction<'_, P>, entity: &dyn Any) -> Result<()> {
        <M as EntityMapper<P>>::delete(self, tx, downcast::<P, M>(self, entity)?)
    }

    fn fetch_any(&self, id: EntityId, conn: &P::Connection) -> Result<Option<Box<dyn Any>>> {
        Ok(<M as EntityMapper<P>>::fetch(self, id, conn)?
            .map(|entity| Box::new(entity) as Box<dyn Any>))
    }
}

fn downcast<'e, P, M>(mapper: &M, entity: &'e dyn Any) -> Result<&'e M::Entity>
where
    P: ConnectionProvider,
    M: EntityMapper<P>,
{
    entity.downcast_ref::<M::Entity>().ok_or_else(|| {
        UowError::MapperEntityMismatch {
            entity_type: type_name::<M::Entity>().to_string(),
            mapper: <M as EntityMapper<P>>::name(mapper).to_string(),
        }
        .into()
    })
}

/// Ordered collection of mappers supplied to a unit of work
///
/// Resolution is strict: exactly one registered mapper must handle a kind.
pub struct MapperRegistry<P: ConnectionProvider> {
    mappers: Vec<Box<dyn ErasedMapper<P>>>,
}

impl<P: ConnectionProvider> MapperRegistry<P> {
    pub fn new() -> Self {
        Self {
            mappers: Vec::new(),
        }
    }

    /// Builder-style `register`
    pub fn with<M>(mut self, mapper: M) -> Self
    where
        M: EntityMapper<P> + 'static,
    {
        self.register(mapper);
        self
    }

    pub fn register<M>(&mut self, mapper: M)
    where
        M: EntityMapper<P> + 'static,
    {
        tracing::debug!(
            mapper = <M as EntityMapper<P>>::name(&mapper),
            "mapper registered"
        );
        self.mappers.push(Box::new(mapper));
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Registered mapper names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    /// Name of the mapper that would serve `kind`
    ///
    /// # Errors
    ///
    /// `MissingMapping` when no mapper handles `kind`, `AmbiguousMapping`
    /// when several do.
    pub fn mapper_name_for(&self, kind: EntityKind) -> Result<&'static str> {
        self.resolve(kind).map(|m| m.name())
    }

    pub(crate) fn resolve(&self, kind: EntityKind) -> Result<&dyn ErasedMapper<P>> {
        let matching: Vec<&dyn ErasedMapper<P>> = self
            .mappers
            .iter()
            .filter(|m| m.handles(kind))
            .map(|m| &**m)
            .collect();

        match matching.as_slice() {
            [] => Err(UowError::MapperNotRegistered {
                entity_type: kind.name().to_string(),
            }
            .into()),
            [mapper] => {
                tracing::debug!(entity_type = %kind, mapper = mapper.name(), "mapper resolved");
                Ok(*mapper)
            }
            candidates => Err(UowError::AmbiguousMapper {
                entity_type: kind.name().to_string(),
                candidates: candidates.iter().map(|m| m.name().to_string()).collect(),
            }
            .into()),
        }
    }
}

impl<P: ConnectionProvider> Default for MapperRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ConnectionProvider> std::fmt::Debug for MapperRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mappers", &self.names())
            .finish()
    }
}
