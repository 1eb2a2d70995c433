//! Unit of Work with an identity map
//!
//! A `UnitOfWork` is one session. It holds three disjoint identity sets:
//!
//! - `new`: registered, never written
//! - `tracked`: loaded or already committed; clean or dirty
//! - `deleted`: marked for removal, invisible to lookups
//!
//! `commit` writes everything in one transaction: inserts, then updates of
//! entities whose snapshot differs from their baseline, then deletes. The
//! sets are cleared only after the transaction committed; on any failure
//! the session is left exactly as it was and `commit` can be retried.
//!
//! A session is single-threaded: handles are `Rc<RefCell<_>>`.

use crate::entity::{share, Entity, EntityKind, Shared};
use crate::errors::{ExError, ExErrorKind, Result, UowError};
use crate::identity_map::{IdentitySet, Slot};
use crate::mapper::{ErasedMapper, MapperRegistry};
use crate::provider::{ConnectionProvider, Transaction};
use crate::repository::Repository;
use crate::{log_op_end, log_op_error, log_op_start};
use std::time::Instant;
use uowmap_core_types::EntityId;

/// What the next `commit` would write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

/// What a successful `commit` wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Tracked entities without changes; no statement was issued for them
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert,
    Update,
    Delete,
}

/// One mapper call of a commit
struct Step<'a, P: ConnectionProvider> {
    op: Op,
    slot: &'a Slot,
    mapper: &'a dyn ErasedMapper<P>,
}

impl<P: ConnectionProvider> Step<'_, P> {
    fn apply(&self, tx: &Transaction<'_, P>) -> Result<()> {
        let mapper = self.mapper;
        let op = self.op;
        self.slot.entity().with_entity(&mut |entity| match op {
            Op::Insert => mapper.insert_any(tx, entity),
            Op::Update => mapper.update_any(tx, entity),
            Op::Delete => mapper.delete_any(tx, entity),
        })
    }
}

/// Session-scoped identity map and change tracker
pub struct UnitOfWork<P: ConnectionProvider> {
    provider: P,
    registry: MapperRegistry<P>,
    new: IdentitySet,
    tracked: IdentitySet,
    deleted: IdentitySet,
}

impl<P: ConnectionProvider> UnitOfWork<P> {
    pub fn new(provider: P, registry: MapperRegistry<P>) -> Self {
        Self {
            provider,
            registry,
            new: IdentitySet::default(),
            tracked: IdentitySet::default(),
            deleted: IdentitySet::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &MapperRegistry<P> {
        &self.registry
    }

    /// Typed facade over this session
    pub fn repository<T: Entity>(&mut self) -> Repository<'_, P, T> {
        Repository::new(self)
    }

    /// Register an entity that does not exist in storage yet
    ///
    /// Registering the same handle twice is a no-op.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when another instance with the same identity is part
    /// of the session; `Concurrency` when the handle is mutably borrowed.
    pub fn register_new<T: Entity>(&mut self, entity: Shared<T>) -> Result<()> {
        let id = identity_of(&entity)?;
        if let Some(slot) = self.new.get(&id) {
            if slot.holds_instance(&entity) {
                return Ok(());
            }
        }
        if self.new.contains(&id) || self.tracked.contains(&id) || self.deleted.contains(&id) {
            return Err(UowError::DuplicateIdentity { entity_id: id }.into());
        }

        tracing::debug!(entity_id = %id, entity_type = %EntityKind::of::<T>(), "registered new");
        self.new.insert(id, Slot::new(id, entity, false));
        Ok(())
    }

    /// Mark an entity for deletion
    ///
    /// Idempotent. The identity leaves `new`/`tracked` immediately and
    /// `get_by_id` no longer finds it. An entity that was only registered as
    /// new is never written at all.
    ///
    /// # Errors
    ///
    /// `Concurrency` when the handle is mutably borrowed.
    pub fn delete<T: Entity>(&mut self, entity: &Shared<T>) -> Result<()> {
        let id = identity_of(entity)?;
        if self.deleted.contains(&id) {
            return Ok(());
        }

        let slot = match self.new.remove(&id) {
            Some(slot) => slot,
            None => self
                .tracked
                .remove(&id)
                .unwrap_or_else(|| Slot::new(id, entity.clone(), true)),
        };
        tracing::debug!(entity_id = %id, persisted = slot.persisted(), "marked deleted");
        self.deleted.insert(id, slot);
        Ok(())
    }

    /// Look up an entity by identity
    ///
    /// Returns the session's own instance when the identity is tracked or
    /// new, `None` when it was deleted in this session. Otherwise loads it
    /// through the mapper for `T` on a fresh connection and tracks it.
    /// `None` also covers "no such row" and an identity held by the session
    /// under a different entity type.
    ///
    /// # Errors
    ///
    /// Configuration errors from mapper resolution; persistence errors from
    /// the provider or the mapper's fetch.
    pub fn get_by_id<T: Entity>(&mut self, id: EntityId) -> Result<Option<Shared<T>>> {
        if self.deleted.contains(&id) {
            return Ok(None);
        }
        if let Some(slot) = self.tracked.get(&id).or_else(|| self.new.get(&id)) {
            let found = slot.downcast::<T>();
            if found.is_none() {
                tracing::debug!(
                    entity_id = %id,
                    requested = %EntityKind::of::<T>(),
                    held = %slot.entity().kind(),
                    "identity held under another entity type"
                );
            }
            return Ok(found);
        }

        let kind = EntityKind::of::<T>();
        log_op_start!("uow_load", entity_id = %id, entity_type = %kind);
        let start = Instant::now();

        match self.load::<T>(id, kind) {
            Ok(found) => {
                log_op_end!(
                    "uow_load",
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity_id = %id,
                    found = found.is_some()
                );
                Ok(found)
            }
            Err(err) => {
                log_op_error!(
                    "uow_load",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity_id = %id
                );
                Err(err)
            }
        }
    }

    fn load<T: Entity>(&mut self, id: EntityId, kind: EntityKind) -> Result<Option<Shared<T>>> {
        let mapper = self.registry.resolve(kind)?;
        let fetched = {
            let conn = self.provider.open()?;
            mapper.fetch_any(id, &conn)?
        };
        let Some(boxed) = fetched else {
            return Ok(None);
        };

        let entity = boxed
            .downcast::<T>()
            .map_err(|_| UowError::MapperEntityMismatch {
                entity_type: kind.name().to_string(),
                mapper: mapper.name().to_string(),
            })?;
        let handle = share(*entity);
        self.tracked.insert(id, Slot::new(id, handle.clone(), true));
        Ok(Some(handle))
    }

    /// Persist all pending changes in one transaction
    ///
    /// Tracked entities without changes cost no statement. After success the
    /// sets are empty and every inserted or updated entity has its baseline
    /// reset to its current snapshot. A session with nothing to write does
    /// not touch storage.
    ///
    /// # Errors
    ///
    /// `Concurrency` if the caller holds any borrow, shared or mutable, of a
    /// session entity; configuration errors from mapper resolution, persistence errors from
    /// the provider or a mapper. On every error nothing is committed and the
    /// session is unchanged.
    pub fn commit(&mut self) -> Result<CommitSummary> {
        let pending = self.pending();
        log_op_start!(
            "uow_commit",
            inserts = pending.inserts,
            updates = pending.updates,
            deletes = pending.deletes
        );
        let start = Instant::now();

        match self.commit_inner() {
            Ok(summary) => {
                log_op_end!(
                    "uow_commit",
                    duration_ms = start.elapsed().as_millis() as u64,
                    inserts = summary.inserted,
                    updates = summary.updated,
                    deletes = summary.deleted,
                    skipped = summary.skipped
                );
                Ok(summary)
            }
            Err(err) => {
                log_op_error!(
                    "uow_commit",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    fn commit_inner(&mut self) -> Result<CommitSummary> {
        self.ensure_unborrowed()?;

        let mut summary = CommitSummary::default();
        {
            let plan = self.plan(&mut summary)?;
            if !plan.is_empty() {
                let mut conn = self.provider.open()?;
                let tx = Transaction::begin(&self.provider, &mut conn)?;
                for step in &plan {
                    step.apply(&tx)?;
                }
                tx.commit()?;
            }
        }

        for (_, slot) in self.new.iter().chain(self.tracked.iter()) {
            slot.entity().mark_clean();
        }
        self.clear();
        Ok(summary)
    }

    /// Resolve every mapper before any statement runs
    fn plan(&self, summary: &mut CommitSummary) -> Result<Vec<Step<'_, P>>> {
        let mut plan = Vec::with_capacity(self.new.len() + self.tracked.len() + self.deleted.len());

        for (_, slot) in self.new.iter() {
            plan.push(self.step(Op::Insert, slot)?);
            summary.inserted += 1;
        }
        for (_, slot) in self.tracked.iter() {
            if slot.entity().has_changes() {
                plan.push(self.step(Op::Update, slot)?);
                summary.updated += 1;
            } else {
                summary.skipped += 1;
            }
        }
        for (_, slot) in self.deleted.iter() {
            if slot.persisted() {
                plan.push(self.step(Op::Delete, slot)?);
                summary.deleted += 1;
            }
        }

        Ok(plan)
    }

    fn step<'a>(&'a self, op: Op, slot: &'a Slot) -> Result<Step<'a, P>> {
        let mapper = self.registry.resolve(slot.entity().kind())?;
        Ok(Step { op, slot, mapper })
    }

    fn ensure_unborrowed(&self) -> Result<()> {
        let all = self
            .new
            .iter()
            .chain(self.tracked.iter())
            .chain(self.deleted.iter());
        for (id, slot) in all {
            if slot.entity().is_borrowed() {
                return Err(UowError::EntityBorrowed { entity_id: *id }.into());
            }
        }
        Ok(())
    }

    /// Counts of what `commit` would write right now
    pub fn pending(&self) -> PendingChanges {
        PendingChanges {
            inserts: self.new.len(),
            updates: self
                .tracked
                .iter()
                .filter(|(_, slot)| slot.entity().has_changes())
                .count(),
            deletes: self
                .deleted
                .iter()
                .filter(|(_, slot)| slot.persisted())
                .count(),
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending().is_empty()
    }

    pub fn is_new(&self, id: EntityId) -> bool {
        self.new.contains(&id)
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.tracked.contains(&id)
    }

    pub fn is_deleted(&self, id: EntityId) -> bool {
        self.deleted.contains(&id)
    }

    /// Abandon every pending change; storage is never touched
    pub fn rollback(&mut self) {
        let pending = self.pending();
        tracing::debug!(
            inserts = pending.inserts,
            updates = pending.updates,
            deletes = pending.deletes,
            "discarding pending changes"
        );
        self.clear();
    }

    /// Drop all session state without touching storage
    pub fn clear(&mut self) {
        self.new.clear();
        self.tracked.clear();
        self.deleted.clear();
    }

    /// True when no entity is part of the session
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.tracked.is_empty() && self.deleted.is_empty()
    }
}

impl<P: ConnectionProvider> std::fmt::Debug for UnitOfWork<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("new", &self.new.len())
            .field("tracked", &self.tracked.len())
            .field("deleted", &self.deleted.len())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Identity of a handle the caller is not mutating right now
fn identity_of<T: Entity>(entity: &Shared<T>) -> Result<EntityId> {
    entity.try_borrow().map(|e| e.id()).map_err(|_| {
        ExError::new(ExErrorKind::Concurrency)
            .with_entity_type(EntityKind::of::<T>().name())
            .with_message("Entity is mutably borrowed by the caller")
    })
}
