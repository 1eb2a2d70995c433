#![allow(dead_code)]

use rusqlite::{params, OptionalExtension};
use std::cell::Cell;
use std::rc::Rc;
use uowmap_core::{
    ConnectionProvider, EntityId, EntityMapper, ExError, ExErrorKind, MapperRegistry, Result,
    Transaction, UnitOfWork,
};
use uowmap_store::{SqliteProvider, User, UserMapper};

/// Insert a row directly, outside any session
pub fn seed_user(provider: &SqliteProvider, name: &str) -> EntityId {
    let id = EntityId::new();
    provider
        .open()
        .expect("open")
        .execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2)",
            params![id.to_string(), name],
        )
        .expect("seed user");
    id
}

pub fn stored_name(provider: &SqliteProvider, id: EntityId) -> Option<String> {
    provider
        .open()
        .expect("open")
        .query_row(
            "SELECT name FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .expect("query name")
}

pub fn user_count(provider: &SqliteProvider) -> i64 {
    provider
        .open()
        .expect("open")
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .expect("count")
}

/// `UserMapper` that counts statements and can fail updates
#[derive(Clone, Default)]
pub struct CountingUserMapper {
    inner: UserMapper,
    pub inserts: Rc<Cell<usize>>,
    pub updates: Rc<Cell<usize>>,
    pub deletes: Rc<Cell<usize>>,
    pub fail_updates: Rc<Cell<bool>>,
}

impl EntityMapper<SqliteProvider> for CountingUserMapper {
    type Entity = User;

    fn insert(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        self.inserts.set(self.inserts.get() + 1);
        self.inner.insert(tx, user)
    }

    fn update(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        self.updates.set(self.updates.get() + 1);
        if self.fail_updates.get() {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("user_update")
                .with_message("injected failure"));
        }
        self.inner.update(tx, user)
    }

    fn delete(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        self.deletes.set(self.deletes.get() + 1);
        self.inner.delete(tx, user)
    }

    fn fetch(&self, id: EntityId, conn: &rusqlite::Connection) -> Result<Option<User>> {
        self.inner.fetch(id, conn)
    }
}

/// A session whose only mapper is `mapper`
pub fn counting_session(
    provider: &SqliteProvider,
    mapper: &CountingUserMapper,
) -> UnitOfWork<SqliteProvider> {
    UnitOfWork::new(
        provider.clone(),
        MapperRegistry::new().with(mapper.clone()),
    )
}
