//! Commit Tests
//!
//! ## Scenarios Covered
//!
//! 1. Modified entities are updated, unmodified ones cost nothing
//! 2. Writes run as inserts, then updates, then deletes
//! 3. A successful commit clears the session and refreshes baselines
//! 4. Commits with nothing to write do not touch storage

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{new_session, session_on, Call, Note};
use std::rc::Rc;
use uowmap_core::{share, CommitSummary, Entity, EntityId, PendingChanges};

#[test]
fn test_modified_entity_is_updated() {
    // GIVEN a loaded note
    let (mut uow, provider, mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    let note = uow.get_by_id::<Note>(id).unwrap().unwrap();

    // WHEN it is renamed and the session committed
    note.borrow_mut().title = "New name".to_string();
    let summary = uow.commit().unwrap();

    // THEN exactly one update was issued and the row holds the new name
    assert_eq!(mapper.count(|c| matches!(c, Call::Update(_))), 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(provider.row(id).as_deref(), Some("New name"));

    // AND a fresh session sees the new name
    let mut next = session_on(&provider, &mapper);
    let reloaded = next.get_by_id::<Note>(id).unwrap().unwrap();
    assert_eq!(reloaded.borrow().title, "New name");
}

#[test]
fn test_unmodified_entity_is_not_updated() {
    let (mut uow, provider, mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    uow.get_by_id::<Note>(id).unwrap().unwrap();

    let summary = uow.commit().unwrap();

    assert_eq!(mapper.count(|c| matches!(c, Call::Update(_))), 0);
    assert_eq!(
        summary,
        CommitSummary {
            skipped: 1,
            ..CommitSummary::default()
        }
    );
}

#[test]
fn test_reverted_change_is_not_updated() {
    let (mut uow, provider, mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    let note = uow.get_by_id::<Note>(id).unwrap().unwrap();

    note.borrow_mut().title = "Other".to_string();
    note.borrow_mut().title = "Test".to_string();
    uow.commit().unwrap();

    assert_eq!(mapper.count(|c| matches!(c, Call::Update(_))), 0);
}

#[test]
fn test_new_entity_is_inserted() {
    let (mut uow, provider, mapper) = new_session();
    let note = share(Note::new("Fresh"));
    let id = note.borrow().id;
    uow.register_new(note.clone()).unwrap();

    let summary = uow.commit().unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(mapper.calls(), vec![Call::Insert(id)]);
    assert_eq!(provider.row(id).as_deref(), Some("Fresh"));
    assert!(!note.borrow().has_changes());
}

#[test]
fn test_writes_run_inserts_then_updates_then_deletes() {
    // GIVEN one new, one modified and one deleted note
    let (mut uow, provider, mapper) = new_session();
    let kept = EntityId::new();
    let doomed = EntityId::new();
    provider.seed(kept, "Kept");
    provider.seed(doomed, "Doomed");

    let kept_note = uow.get_by_id::<Note>(kept).unwrap().unwrap();
    let doomed_note = uow.get_by_id::<Note>(doomed).unwrap().unwrap();
    mapper.reset_calls();

    uow.delete(&doomed_note).unwrap();
    kept_note.borrow_mut().title = "Kept v2".to_string();
    let fresh = share(Note::new("Fresh"));
    let fresh_id = fresh.borrow().id;
    uow.register_new(fresh).unwrap();

    // WHEN committed
    let summary = uow.commit().unwrap();

    // THEN writes ran in insert, update, delete order inside one transaction
    assert_eq!(
        mapper.calls(),
        vec![
            Call::Insert(fresh_id),
            Call::Update(kept),
            Call::Delete(doomed)
        ]
    );
    assert_eq!(provider.begun(), 1);
    assert_eq!(provider.commits(), 1);
    assert_eq!(
        (summary.inserted, summary.updated, summary.deleted),
        (1, 1, 1)
    );
    assert_eq!(provider.row_count(), 2);
}

#[test]
fn test_commit_clears_session() {
    let (mut uow, provider, mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    let before = uow.get_by_id::<Note>(id).unwrap().unwrap();
    before.borrow_mut().title = "Changed".to_string();
    uow.register_new(share(Note::new("Fresh"))).unwrap();

    uow.commit().unwrap();

    assert!(uow.is_empty());
    assert!(!uow.has_pending_changes());

    // The identity is loaded again, as a new instance
    let after = uow.get_by_id::<Note>(id).unwrap().unwrap();
    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(after.borrow().title, "Changed");
    assert_eq!(mapper.count(|c| matches!(c, Call::Fetch(_))), 2);
}

#[test]
fn test_committed_entity_has_fresh_baseline() {
    let (mut uow, provider, _mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    let note = uow.get_by_id::<Note>(id).unwrap().unwrap();
    note.borrow_mut().title = "Changed".to_string();

    uow.commit().unwrap();

    assert!(!note.borrow().has_changes());
    note.borrow_mut().title = "Changed again".to_string();
    assert!(note.borrow().has_changes());
}

#[test]
fn test_second_commit_writes_nothing() {
    let (mut uow, provider, mapper) = new_session();
    uow.register_new(share(Note::new("Once"))).unwrap();
    uow.commit().unwrap();
    let opened = provider.opened();

    let summary = uow.commit().unwrap();

    assert_eq!(summary, CommitSummary::default());
    assert_eq!(provider.opened(), opened);
    assert_eq!(mapper.count(|c| matches!(c, Call::Insert(_))), 1);
}

#[test]
fn test_empty_commit_does_not_touch_storage() {
    let (mut uow, provider, _mapper) = new_session();

    uow.commit().unwrap();

    assert_eq!(provider.opened(), 0);
    assert_eq!(provider.begun(), 0);
}

#[test]
fn test_added_then_deleted_entity_is_never_written() {
    let (mut uow, provider, mapper) = new_session();
    let note = share(Note::new("Ephemeral"));
    uow.register_new(note.clone()).unwrap();
    uow.delete(&note).unwrap();

    uow.commit().unwrap();

    assert!(mapper.calls().is_empty());
    assert_eq!(provider.row_count(), 0);
    assert!(uow.is_empty());
}

#[test]
fn test_delete_of_entity_from_another_session() {
    // GIVEN a note loaded in one session
    let (mut first, provider, mapper) = new_session();
    let id = EntityId::new();
    provider.seed(id, "Test");
    let note = first.get_by_id::<Note>(id).unwrap().unwrap();

    // WHEN a second session deletes it
    let mut second = session_on(&provider, &mapper);
    second.delete(&note).unwrap();
    second.commit().unwrap();

    // THEN the row is gone
    assert_eq!(provider.row(id), None);
    assert_eq!(mapper.count(|c| matches!(c, Call::Delete(_))), 1);
}

#[test]
fn test_pending_reflects_dirty_state() {
    let (mut uow, provider, _mapper) = new_session();
    let a = EntityId::new();
    let b = EntityId::new();
    provider.seed(a, "A");
    provider.seed(b, "B");
    let note_a = uow.get_by_id::<Note>(a).unwrap().unwrap();
    uow.get_by_id::<Note>(b).unwrap().unwrap();

    assert_eq!(uow.pending(), PendingChanges::default());

    note_a.borrow_mut().title = "A2".to_string();
    uow.register_new(share(Note::new("C"))).unwrap();

    assert_eq!(
        uow.pending(),
        PendingChanges {
            inserts: 1,
            updates: 1,
            deletes: 0
        }
    );
    assert_eq!(uow.pending().total(), 2);
}
