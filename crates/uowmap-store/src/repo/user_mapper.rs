use crate::errors::{from_rusqlite, invalid_identity, Result};
use crate::model::User;
use crate::provider::SqliteProvider;
use rusqlite::{params, Connection, OptionalExtension};
use uowmap_core::{Entity, EntityId, EntityMapper, Transaction};

/// Maps `User` to the `users` table
#[derive(Debug, Default, Clone, Copy)]
pub struct UserMapper;

impl EntityMapper<SqliteProvider> for UserMapper {
    type Entity = User;

    fn insert(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        tx.connection()
            .execute(
                "INSERT INTO users (id, name) VALUES (?1, ?2)",
                params![user.id().to_string(), user.name],
            )
            .map_err(|e| {
                from_rusqlite(e)
                    .with_op("user_insert")
                    .with_entity_type("User")
                    .with_entity_id(user.id())
            })?;
        Ok(())
    }

    fn update(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        let affected = tx
            .connection()
            .execute(
                "UPDATE users SET name = ?2 WHERE id = ?1",
                params![user.id().to_string(), user.name],
            )
            .map_err(|e| {
                from_rusqlite(e)
                    .with_op("user_update")
                    .with_entity_type("User")
                    .with_entity_id(user.id())
            })?;
        if affected == 0 {
            tracing::debug!(entity_id = %user.id(), "update matched no row");
        }
        Ok(())
    }

    fn delete(&self, tx: &Transaction<'_, SqliteProvider>, user: &User) -> Result<()> {
        tx.connection()
            .execute(
                "DELETE FROM users WHERE id = ?1",
                params![user.id().to_string()],
            )
            .map_err(|e| {
                from_rusqlite(e)
                    .with_op("user_delete")
                    .with_entity_type("User")
                    .with_entity_id(user.id())
            })?;
        Ok(())
    }

    fn fetch(&self, id: EntityId, conn: &Connection) -> Result<Option<User>> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, name FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| {
                from_rusqlite(e)
                    .with_op("user_fetch")
                    .with_entity_type("User")
                    .with_entity_id(id)
            })?;

        let Some((raw_id, name)) = row else {
            return Ok(None);
        };
        let stored_id = EntityId::parse_str(&raw_id).map_err(|e| invalid_identity(&raw_id, e))?;
        Ok(Some(User::loaded(stored_id, name)))
    }

    fn name(&self) -> &'static str {
        "UserMapper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uowmap_core::{ConnectionProvider, ExErrorKind};

    fn insert(provider: &SqliteProvider, user: &User) -> Result<()> {
        let mut conn = provider.open()?;
        let tx = Transaction::begin(provider, &mut conn)?;
        UserMapper.insert(&tx, user)?;
        tx.commit()
    }

    #[test]
    fn test_fetch_returns_clean_user() {
        let provider = SqliteProvider::in_memory().unwrap();
        let user = User::create("Ada");
        insert(&provider, &user).unwrap();

        let conn = provider.open().unwrap();
        let fetched = UserMapper.fetch(user.id(), &conn).unwrap().unwrap();

        assert_eq!(fetched, user);
        assert_eq!(fetched.name, "Ada");
        assert!(!fetched.has_changes());
    }

    #[test]
    fn test_fetch_missing_is_none() {
        let provider = SqliteProvider::in_memory().unwrap();
        let conn = provider.open().unwrap();

        assert!(UserMapper.fetch(EntityId::new(), &conn).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_is_constraint_violation() {
        let provider = SqliteProvider::in_memory().unwrap();
        let user = User::create("Ada");
        insert(&provider, &user).unwrap();

        let err = insert(&provider, &User::new(user.id(), "Eve")).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
        assert_eq!(err.op(), Some("user_insert"));
        assert_eq!(err.entity_type(), Some("User"));
    }
}
