//! Mappers and session helpers for the SQLite store

mod user_mapper;

pub use user_mapper::UserMapper;

use crate::model::User;
use crate::provider::SqliteProvider;
use uowmap_core::{MapperRegistry, Repository, UnitOfWork};

/// Typed repository of users within one session
pub type Users<'u> = Repository<'u, SqliteProvider, User>;

/// Every mapper this store provides
pub fn user_mappers() -> MapperRegistry<SqliteProvider> {
    MapperRegistry::new().with(UserMapper)
}

/// A fresh session over `provider` with the store's mappers
pub fn open_session(provider: &SqliteProvider) -> UnitOfWork<SqliteProvider> {
    UnitOfWork::new(provider.clone(), user_mappers())
}
