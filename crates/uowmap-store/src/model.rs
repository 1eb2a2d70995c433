//! Persisted domain entities

use serde::Serialize;
use uowmap_core::{Baseline, Entity, EntityId};

/// Persistable fields of a `User`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub id: EntityId,
    pub name: String,
}

/// A user; equality follows identity only
#[derive(Debug, Clone, Serialize)]
pub struct User {
    id: EntityId,
    pub name: String,
    #[serde(skip)]
    baseline: Baseline<UserSnapshot>,
}

impl User {
    /// A user that was never persisted; always reports changes
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            baseline: Baseline::empty(),
        }
    }

    /// A new user with a fresh identity
    pub fn create(name: impl Into<String>) -> Self {
        Self::new(EntityId::new(), name)
    }

    /// A user as read from storage, clean until mutated
    pub fn loaded(id: EntityId, name: impl Into<String>) -> Self {
        let mut user = Self::new(id, name);
        user.mark_clean();
        user
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Entity for User {
    type Snapshot = UserSnapshot;

    fn id(&self) -> EntityId {
        self.id
    }

    fn current_snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            name: self.name.clone(),
        }
    }

    fn baseline(&self) -> &Baseline<UserSnapshot> {
        &self.baseline
    }

    fn baseline_mut(&mut self) -> &mut Baseline<UserSnapshot> {
        &mut self.baseline
    }
}
