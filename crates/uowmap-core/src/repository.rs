//! Typed facade over a unit of work
//!
//! A `Repository<T>` adds nothing of its own: every call delegates to the
//! session it borrows. Persisting still happens only on `UnitOfWork::commit`.

use crate::entity::{share, Entity, Shared};
use crate::errors::Result;
use crate::provider::ConnectionProvider;
use crate::unit_of_work::UnitOfWork;
use std::marker::PhantomData;
use uowmap_core_types::EntityId;

pub struct Repository<'u, P: ConnectionProvider, T: Entity> {
    uow: &'u mut UnitOfWork<P>,
    _entity: PhantomData<fn() -> T>,
}

impl<'u, P: ConnectionProvider, T: Entity> Repository<'u, P, T> {
    pub fn new(uow: &'u mut UnitOfWork<P>) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    /// Register a fresh entity and return its session handle
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the identity is already part of the session.
    pub fn add(&mut self, entity: T) -> Result<Shared<T>> {
        let handle = share(entity);
        self.uow.register_new(handle.clone())?;
        Ok(handle)
    }

    /// Register an entity the caller already holds a handle to
    ///
    /// # Errors
    ///
    /// See [`UnitOfWork::register_new`].
    pub fn add_shared(&mut self, entity: Shared<T>) -> Result<()> {
        self.uow.register_new(entity)
    }

    /// # Errors
    ///
    /// See [`UnitOfWork::get_by_id`].
    pub fn get_by_id(&mut self, id: EntityId) -> Result<Option<Shared<T>>> {
        self.uow.get_by_id::<T>(id)
    }

    /// # Errors
    ///
    /// See [`UnitOfWork::delete`].
    pub fn delete(&mut self, entity: &Shared<T>) -> Result<()> {
        self.uow.delete(entity)
    }

    /// The session this repository delegates to
    pub fn unit_of_work(&mut self) -> &mut UnitOfWork<P> {
        self.uow
    }
}
