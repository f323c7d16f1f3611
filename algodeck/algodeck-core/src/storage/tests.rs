use super::*;
use crate::models::{Note, NoteFolder, Question, QuestionFolder};
use crate::search::SearchKind;

#[test]
fn put_then_get_is_owner_scoped() {
    let mut store = Store::in_memory().unwrap();
    let folder = NoteFolder::new("alice", "Trees");
    let id = folder.id;
    store.put(folder).unwrap();

    assert_eq!(store.get::<NoteFolder>("alice", id).unwrap().name, "Trees");
    assert!(store.get::<NoteFolder>("bob", id).is_none());
    assert_eq!(store.scan::<NoteFolder>("alice").count(), 1);
    assert_eq!(store.scan::<NoteFolder>("bob").count(), 0);
}

#[test]
fn remove_of_foreign_record_is_a_no_op() {
    let mut store = Store::in_memory().unwrap();
    let folder = NoteFolder::new("alice", "Trees");
    let id = folder.id;
    store.put(folder).unwrap();

    assert!(store.remove::<NoteFolder>("bob", id).unwrap().is_none());
    assert!(store.get::<NoteFolder>("alice", id).is_some());
    assert!(store.remove::<NoteFolder>("alice", id).unwrap().is_some());
    assert!(store.get::<NoteFolder>("alice", id).is_none());
}

#[test]
fn store_persists_to_disk() {
    let tempdir = tempfile::tempdir().unwrap();
    let folder = QuestionFolder::top_level("alice", "DSA");
    let sub = QuestionFolder::subfolder(&folder, "Arrays", 0);
    let mut question = Question::new("alice", sub.id, "Two Sum");
    question.toggle_completion(chrono::Utc::now());
    let (fid, sid, qid) = (folder.id, sub.id, question.id);
    {
        let mut store = Store::open(tempdir.path()).unwrap();
        store.put(folder).unwrap();
        store.put(sub).unwrap();
        store.put(question).unwrap();
    }
    let store = Store::open(tempdir.path()).unwrap();
    assert!(store.get::<QuestionFolder>("alice", fid).unwrap().is_top_level());
    assert_eq!(
        store.get::<QuestionFolder>("alice", sid).unwrap().parent_id,
        Some(fid)
    );
    let q = store.get::<Question>("alice", qid).unwrap();
    assert!(q.is_completed());
    assert!(q.completed_at().is_some());
}

#[test]
fn search_index_is_rebuilt_on_open() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut note = Note::new("alice", uuid::Uuid::new_v4(), "BST");
    note.tags = vec!["tree".into()];
    let id = note.id;
    {
        let mut store = Store::with_persistence(persistence.clone()).unwrap();
        store.put(note).unwrap();
    }
    let store = Store::with_persistence(persistence).unwrap();
    assert_eq!(store.search("alice", SearchKind::Note, "tree").unwrap(), vec![id]);
    assert!(store.search("bob", SearchKind::Note, "tree").unwrap().is_empty());
}

#[test]
fn removed_notes_leave_the_index() {
    let mut store = Store::in_memory().unwrap();
    let note = Note::new("alice", uuid::Uuid::new_v4(), "Heap sort");
    let id = note.id;
    store.put(note).unwrap();
    assert_eq!(store.search("alice", SearchKind::Note, "heap").unwrap(), vec![id]);
    store.remove::<Note>("alice", id).unwrap();
    assert!(store.search("alice", SearchKind::Note, "heap").unwrap().is_empty());
}

#[test]
fn index_failure_keeps_the_write_and_heals_on_the_next_one() {
    let mut store = Store::in_memory().unwrap();
    store
        .search
        .fail_writes
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let heap = Note::new("alice", uuid::Uuid::new_v4(), "Heap sort");
    let heap_id = heap.id;
    store.put(heap).unwrap();
    assert!(store.get::<Note>("alice", heap_id).is_some());
    assert!(store.search("alice", SearchKind::Note, "heap").unwrap().is_empty());

    store
        .search
        .fail_writes
        .store(false, std::sync::atomic::Ordering::SeqCst);
    let trie = Note::new("alice", uuid::Uuid::new_v4(), "Trie basics");
    let trie_id = trie.id;
    store.put(trie).unwrap();
    assert_eq!(store.search("alice", SearchKind::Note, "heap").unwrap(), vec![heap_id]);
    assert_eq!(store.search("alice", SearchKind::Note, "trie").unwrap(), vec![trie_id]);
}

#[test]
fn unreadable_records_are_skipped() {
    let tempdir = tempfile::tempdir().unwrap();
    let good = NoteFolder::new("alice", "Graphs");
    {
        let mut store = Store::open(tempdir.path()).unwrap();
        store.put(good.clone()).unwrap();
    }
    let junk = tempdir
        .path()
        .join("note_folders")
        .join(format!("{}.json", uuid::Uuid::new_v4()));
    std::fs::write(junk, b"{ not json").unwrap();

    let store = Store::open(tempdir.path()).unwrap();
    assert_eq!(store.count::<NoteFolder>(), 1);
    assert_eq!(store.get::<NoteFolder>("alice", good.id), Some(&good));
}
