//! Shared fixtures: an in-memory backing store and a recording mapper
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use uowmap_core::{
    Baseline, ConnectionProvider, Entity, EntityId, EntityMapper, ExError, ExErrorKind,
    MapperRegistry, Result, Transaction, UnitOfWork,
};

// ========== Entities ==========

#[derive(Debug, Clone, PartialEq)]
pub struct NoteSnapshot {
    pub id: EntityId,
    pub title: String,
}

#[derive(Debug)]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    baseline: Baseline<NoteSnapshot>,
}

impl Note {
    /// A fresh note with no baseline
    pub fn new(title: &str) -> Self {
        Self {
            id: EntityId::new(),
            title: title.to_string(),
            baseline: Baseline::empty(),
        }
    }

    /// A note as a mapper materializes it
    pub fn loaded(id: EntityId, title: &str) -> Self {
        let mut note = Self {
            id,
            title: title.to_string(),
            baseline: Baseline::empty(),
        };
        note.mark_clean();
        note
    }
}

impl Entity for Note {
    type Snapshot = NoteSnapshot;

    fn id(&self) -> EntityId {
        self.id
    }

    fn current_snapshot(&self) -> NoteSnapshot {
        NoteSnapshot {
            id: self.id,
            title: self.title.clone(),
        }
    }

    fn baseline(&self) -> &Baseline<NoteSnapshot> {
        &self.baseline
    }

    fn baseline_mut(&mut self) -> &mut Baseline<NoteSnapshot> {
        &mut self.baseline
    }
}

/// Second entity type; no mapper handles it unless a test registers one
#[derive(Debug)]
pub struct Tag {
    pub id: EntityId,
    pub label: String,
    baseline: Baseline<String>,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self::with_id(EntityId::new(), label)
    }

    pub fn with_id(id: EntityId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            baseline: Baseline::empty(),
        }
    }
}

impl Entity for Tag {
    type Snapshot = String;

    fn id(&self) -> EntityId {
        self.id
    }

    fn current_snapshot(&self) -> String {
        self.label.clone()
    }

    fn baseline(&self) -> &Baseline<String> {
        &self.baseline
    }

    fn baseline_mut(&mut self) -> &mut Baseline<String> {
        &mut self.baseline
    }
}

// ========== In-memory store ==========

#[derive(Debug, Default)]
pub struct MemoryState {
    pub rows: BTreeMap<EntityId, String>,
    pub opened: usize,
    pub begun: usize,
    pub commits: usize,
    pub rollbacks: usize,
    fail_next_commit: bool,
}

/// Provider over a shared map of committed rows
#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a committed row in place, bypassing any session
    pub fn seed(&self, id: EntityId, title: &str) {
        self.state.borrow_mut().rows.insert(id, title.to_string());
    }

    pub fn row(&self, id: EntityId) -> Option<String> {
        self.state.borrow().rows.get(&id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.state.borrow().rows.len()
    }

    pub fn opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn begun(&self) -> usize {
        self.state.borrow().begun
    }

    pub fn commits(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }

    /// Make the next transaction commit fail after all writes succeeded
    pub fn fail_next_commit(&self) {
        self.state.borrow_mut().fail_next_commit = true;
    }
}

/// A connection; writes are buffered until the transaction commits
pub struct MemoryConnection {
    state: Rc<RefCell<MemoryState>>,
    pending: RefCell<Option<BTreeMap<EntityId, Option<String>>>>,
}

impl MemoryConnection {
    pub fn read(&self, id: EntityId) -> Option<String> {
        if let Some(pending) = self.pending.borrow().as_ref() {
            if let Some(value) = pending.get(&id) {
                return value.clone();
            }
        }
        self.state.borrow().rows.get(&id).cloned()
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.read(id).is_some()
    }

    /// Buffer a write; `None` removes the row
    pub fn write(&self, id: EntityId, title: Option<String>) -> Result<()> {
        let mut pending = self.pending.borrow_mut();
        let Some(pending) = pending.as_mut() else {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("write")
                .with_message("no active transaction"));
        };
        pending.insert(id, title);
        Ok(())
    }
}

impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    fn open(&self) -> Result<MemoryConnection> {
        self.state.borrow_mut().opened += 1;
        Ok(MemoryConnection {
            state: self.state.clone(),
            pending: RefCell::new(None),
        })
    }

    fn begin(&self, conn: &mut MemoryConnection) -> Result<()> {
        self.state.borrow_mut().begun += 1;
        *conn.pending.get_mut() = Some(BTreeMap::new());
        Ok(())
    }

    fn commit(&self, conn: &mut MemoryConnection) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("commit")
                .with_message("database is locked"));
        }
        let pending = conn.pending.get_mut().take().unwrap_or_default();
        for (id, value) in pending {
            match value {
                Some(title) => state.rows.insert(id, title),
                None => state.rows.remove(&id),
            };
        }
        state.commits += 1;
        Ok(())
    }

    fn rollback(&self, conn: &mut MemoryConnection) -> Result<()> {
        *conn.pending.get_mut() = None;
        self.state.borrow_mut().rollbacks += 1;
        Ok(())
    }
}

// ========== Recording mapper ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Insert(EntityId),
    Update(EntityId),
    Delete(EntityId),
    Fetch(EntityId),
}

/// Note mapper that records every call and can be told to fail one
#[derive(Clone, Default)]
pub struct NoteMapper {
    calls: Rc<RefCell<Vec<Call>>>,
    failure: Rc<RefCell<Option<Call>>>,
}

impl NoteMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Fail exactly this call (once)
    pub fn fail_on(&self, call: Call) {
        *self.failure.borrow_mut() = Some(call);
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.borrow_mut().push(call);
        let mut failure = self.failure.borrow_mut();
        if *failure == Some(call) {
            *failure = None;
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("note_mapper")
                .with_message(format!("injected failure on {:?}", call)));
        }
        Ok(())
    }
}

impl EntityMapper<MemoryProvider> for NoteMapper {
    type Entity = Note;

    fn insert(&self, tx: &Transaction<'_, MemoryProvider>, note: &Note) -> Result<()> {
        self.record(Call::Insert(note.id))?;
        let conn = tx.connection();
        if conn.exists(note.id) {
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("insert")
                .with_entity_id(note.id)
                .with_message("duplicate primary key"));
        }
        conn.write(note.id, Some(note.title.clone()))
    }

    fn update(&self, tx: &Transaction<'_, MemoryProvider>, note: &Note) -> Result<()> {
        self.record(Call::Update(note.id))?;
        let conn = tx.connection();
        if conn.exists(note.id) {
            conn.write(note.id, Some(note.title.clone()))?;
        }
        Ok(())
    }

    fn delete(&self, tx: &Transaction<'_, MemoryProvider>, note: &Note) -> Result<()> {
        self.record(Call::Delete(note.id))?;
        tx.connection().write(note.id, None)
    }

    fn fetch(&self, id: EntityId, conn: &MemoryConnection) -> Result<Option<Note>> {
        self.record(Call::Fetch(id))?;
        Ok(conn.read(id).map(|title| Note::loaded(id, &title)))
    }
}

/// A second note mapper, for ambiguity tests
#[derive(Clone, Default)]
pub struct ShadowNoteMapper;

impl EntityMapper<MemoryProvider> for ShadowNoteMapper {
    type Entity = Note;

    fn insert(&self, _tx: &Transaction<'_, MemoryProvider>, _note: &Note) -> Result<()> {
        Ok(())
    }

    fn update(&self, _tx: &Transaction<'_, MemoryProvider>, _note: &Note) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _tx: &Transaction<'_, MemoryProvider>, _note: &Note) -> Result<()> {
        Ok(())
    }

    fn fetch(&self, _id: EntityId, _conn: &MemoryConnection) -> Result<Option<Note>> {
        Ok(None)
    }
}

// ========== Session helpers ==========

/// A session over a fresh store with one `NoteMapper`
pub fn new_session() -> (UnitOfWork<MemoryProvider>, MemoryProvider, NoteMapper) {
    let provider = MemoryProvider::new();
    let mapper = NoteMapper::new();
    let uow = UnitOfWork::new(
        provider.clone(),
        MapperRegistry::new().with(mapper.clone()),
    );
    (uow, provider, mapper)
}

/// Another session over the same store
pub fn session_on(provider: &MemoryProvider, mapper: &NoteMapper) -> UnitOfWork<MemoryProvider> {
    UnitOfWork::new(
        provider.clone(),
        MapperRegistry::new().with(mapper.clone()),
    )
}
