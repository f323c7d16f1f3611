use algodeck_core::models::{
    Difficulty, FolderPayload, NewNote, NewQuestion, NotePatch, NoteQuery, QuestionPatch,
    QuestionQuery,
};
use algodeck_core::storage::{Collection, MemoryPersistence, Persistence};
use algodeck_core::{ServiceError, Services, Store};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn services() -> Services {
    Services::new(Store::in_memory().unwrap().shared())
}

fn new_note(folder: Uuid, title: &str) -> NewNote {
    NewNote {
        folder_id: Some(folder),
        title: Some(title.into()),
        ..Default::default()
    }
}

fn new_question(folder: Uuid, number: i64, title: &str, difficulty: Difficulty) -> NewQuestion {
    NewQuestion {
        folder_id: Some(folder),
        question_number: Some(number),
        title: Some(title.into()),
        difficulty: Some(difficulty),
        ..Default::default()
    }
}

#[tokio::test]
async fn deleting_a_question_folder_removes_subfolder_questions() {
    let svc = services();
    let dsa = svc
        .question_folders
        .create("alice", FolderPayload::named("DSA"))
        .await
        .unwrap();
    let dsa = svc
        .question_folders
        .add_subfolder("alice", dsa.id, FolderPayload::named("Arrays"))
        .await
        .unwrap();
    let arrays = dsa.subfolders[0].id;
    svc.questions
        .create("alice", new_question(arrays, 1, "Two Sum", Difficulty::Easy))
        .await
        .unwrap();
    svc.questions
        .create("alice", new_question(dsa.id, 2, "LRU Cache", Difficulty::Hard))
        .await
        .unwrap();

    let report = svc.question_folders.delete("alice", dsa.id).await.unwrap();
    assert_eq!(report.subfolders, 1);
    assert_eq!(report.questions, 2);
    let left = svc
        .questions
        .list("alice", &QuestionQuery::default())
        .await
        .unwrap();
    assert!(left.is_empty());
    assert!(svc.question_folders.list("alice").await.is_empty());
}

#[tokio::test]
async fn pinned_note_sorts_first() {
    let svc = services();
    let trees = svc
        .note_folders
        .create("alice", FolderPayload::named("Trees"))
        .await
        .unwrap();
    let mut bst = new_note(trees.folder.id, "BST");
    bst.tags = Some(vec!["tree".into(), "bst".into()]);
    let bst = svc.notes.create("alice", bst).await.unwrap();
    svc.notes
        .create("alice", new_note(trees.folder.id, "AVL"))
        .await
        .unwrap();

    let pinned = svc.notes.toggle_pin("alice", bst.id).await.unwrap();
    assert!(pinned.is_pinned);
    let notes = svc.notes.list("alice", &NoteQuery::default()).await.unwrap();
    assert_eq!(notes[0].id, bst.id);
    assert_eq!(notes.len(), 2);
}

#[tokio::test]
async fn stats_round_the_completion_rate() {
    let svc = services();
    let folder = svc
        .question_folders
        .create("alice", FolderPayload::named("Mixed"))
        .await
        .unwrap();
    let done = svc
        .questions
        .create("alice", new_question(folder.id, 1, "a", Difficulty::Easy))
        .await
        .unwrap();
    svc.questions
        .create("alice", new_question(folder.id, 2, "b", Difficulty::Easy))
        .await
        .unwrap();
    svc.questions
        .create("alice", new_question(folder.id, 3, "c", Difficulty::Hard))
        .await
        .unwrap();
    svc.questions.toggle_complete("alice", done.id).await.unwrap();

    let stats = svc.stats.stats("alice").await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completion_rate, 33);
    assert_eq!(stats.by_difficulty.easy.total, 2);
    assert_eq!(stats.by_difficulty.easy.completed, 1);
    assert_eq!(stats.by_difficulty.hard.total, 1);
    assert_eq!(stats.by_difficulty.hard.completed, 0);
    assert_eq!(svc.stats.stats("bob").await.total, 0);
}

#[tokio::test]
async fn other_owners_see_not_found() {
    let svc = services();
    let folder = svc
        .note_folders
        .create("alice", FolderPayload::named("Graphs"))
        .await
        .unwrap();
    let note = svc
        .notes
        .create("alice", new_note(folder.folder.id, "Dijkstra"))
        .await
        .unwrap();

    assert!(matches!(
        svc.notes.get("bob", note.id).await,
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        svc.notes.toggle_pin("bob", note.id).await,
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        svc.note_folders.delete("bob", folder.folder.id).await,
        Err(ServiceError::NotFound { .. })
    ));
    // bob cannot file a note into alice's folder either
    assert!(matches!(
        svc.notes.create("bob", new_note(folder.folder.id, "x")).await,
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(svc.notes.get("alice", note.id).await.unwrap().title, "Dijkstra");
}

#[tokio::test]
async fn create_requires_title_and_folder() {
    let svc = services();
    let folder = svc
        .note_folders
        .create("alice", FolderPayload::named("Trees"))
        .await
        .unwrap();
    let err = svc
        .notes
        .create("alice", new_note(folder.folder.id, "   "))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Title is required");

    let err = svc
        .notes
        .create(
            "alice",
            NewNote {
                title: Some("BST".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Folder ID is required");

    let err = svc
        .note_folders
        .create("alice", FolderPayload::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Folder name is required");
}

#[tokio::test]
async fn note_counts_follow_creates_deletes_and_moves() {
    let svc = services();
    let a = svc
        .note_folders
        .create("alice", FolderPayload::named("A"))
        .await
        .unwrap();
    let b = svc
        .note_folders
        .create("alice", FolderPayload::named("B"))
        .await
        .unwrap();
    assert_eq!(a.note_count, 0);

    let n1 = svc.notes.create("alice", new_note(a.folder.id, "one")).await.unwrap();
    let n2 = svc.notes.create("alice", new_note(a.folder.id, "two")).await.unwrap();
    assert_eq!(svc.note_folders.get("alice", a.folder.id).await.unwrap().note_count, 2);

    svc.notes
        .update(
            "alice",
            n1.id,
            NotePatch {
                folder_id: Some(b.folder.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    svc.notes.delete("alice", n2.id).await.unwrap();

    let folders = svc.note_folders.list("alice").await;
    let count = |id| folders.iter().find(|f| f.folder.id == id).unwrap().note_count;
    assert_eq!(count(a.folder.id), 0);
    assert_eq!(count(b.folder.id), 1);
}

#[tokio::test]
async fn partial_update_keeps_unsupplied_fields() {
    let svc = services();
    let folder = svc
        .question_folders
        .create("alice", FolderPayload::named("DP"))
        .await
        .unwrap();
    let mut payload = new_question(folder.id, 70, "Climbing Stairs", Difficulty::Easy);
    payload.link = Some(" https://leetcode.com/problems/climbing-stairs ".into());
    payload.tags = Some(vec!["DP".into(), "dp".into()]);
    let q = svc.questions.create("alice", payload).await.unwrap();
    assert_eq!(q.tags, vec!["dp".to_string()]);
    assert_eq!(q.link, "https://leetcode.com/problems/climbing-stairs");

    let updated = svc
        .questions
        .update(
            "alice",
            q.id,
            QuestionPatch {
                notes: Some("fibonacci".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Climbing Stairs");
    assert_eq!(updated.question_number, 70);
    assert_eq!(updated.difficulty, Difficulty::Easy);
    assert_eq!(updated.notes, "fibonacci");
    assert!(updated.updated_at >= q.updated_at);

    let err = svc
        .questions
        .update(
            "alice",
            q.id,
            QuestionPatch {
                title: Some(" ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn question_filters_combine() {
    let svc = services();
    let folder = svc
        .question_folders
        .create("alice", FolderPayload::named("Graphs"))
        .await
        .unwrap();
    let other = svc
        .question_folders
        .create("alice", FolderPayload::named("Strings"))
        .await
        .unwrap();
    let mut bfs = new_question(folder.id, 2, "Rotting Oranges", Difficulty::Medium);
    bfs.notes = Some("multi-source bfs".into());
    let bfs = svc.questions.create("alice", bfs).await.unwrap();
    svc.questions
        .create("alice", new_question(folder.id, 1, "Clone Graph", Difficulty::Medium))
        .await
        .unwrap();
    svc.questions
        .create("alice", new_question(other.id, 3, "Valid Anagram", Difficulty::Easy))
        .await
        .unwrap();
    svc.questions.toggle_complete("alice", bfs.id).await.unwrap();

    let in_folder = svc
        .questions
        .list(
            "alice",
            &QuestionQuery {
                folder_id: Some(folder.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let numbers: Vec<i64> = in_folder.iter().map(|q| q.question_number).collect();
    assert_eq!(numbers, vec![1, 2]);

    let done = svc
        .questions
        .list(
            "alice",
            &QuestionQuery {
                completed: Some(true),
                difficulty: Some(Difficulty::Medium),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, bfs.id);

    let found = svc
        .questions
        .list(
            "alice",
            &QuestionQuery {
                search: Some("BFS anagram".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn subfolders_are_not_top_level_folders() {
    let svc = services();
    let folder = svc
        .question_folders
        .create("alice", FolderPayload::named("DSA"))
        .await
        .unwrap();
    let folder = svc
        .question_folders
        .add_subfolder("alice", folder.id, FolderPayload::named("Arrays"))
        .await
        .unwrap();
    let folder = svc
        .question_folders
        .add_subfolder("alice", folder.id, FolderPayload::named("Trees"))
        .await
        .unwrap();
    let names: Vec<_> = folder.subfolders.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Arrays", "Trees"]);

    let arrays = folder.subfolders[0].id;
    assert!(matches!(
        svc.question_folders
            .add_subfolder("alice", arrays, FolderPayload::named("Nested"))
            .await,
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        svc.question_folders.get("alice", arrays).await,
        Err(ServiceError::NotFound { .. })
    ));
    assert_eq!(svc.question_folders.list("alice").await.len(), 1);
}

/// Fails the removal of any record whose id is in `failing`.
#[derive(Default)]
struct FlakyPersistence {
    inner: MemoryPersistence,
    failing: Mutex<HashSet<Uuid>>,
}

impl FlakyPersistence {
    fn fail_removal_of(&self, ids: impl IntoIterator<Item = Uuid>) {
        self.failing.lock().extend(ids);
    }

    fn heal(&self) {
        self.failing.lock().clear();
    }
}

impl Persistence for FlakyPersistence {
    fn load(&self, collection: Collection) -> anyhow::Result<Vec<(Uuid, Vec<u8>)>> {
        self.inner.load(collection)
    }

    fn write(&self, collection: Collection, id: Uuid, bytes: &[u8]) -> anyhow::Result<()> {
        self.inner.write(collection, id, bytes)
    }

    fn remove(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
        if self.failing.lock().contains(&id) {
            anyhow::bail!("disk unavailable");
        }
        self.inner.remove(collection, id)
    }
}

#[tokio::test]
async fn failed_cascade_is_reported_and_repaired() {
    let persistence = Arc::new(FlakyPersistence::default());
    let svc = Services::new(Store::with_persistence(persistence.clone()).unwrap().shared());
    let folder = svc
        .note_folders
        .create("alice", FolderPayload::named("Heaps"))
        .await
        .unwrap();
    let heapify = svc
        .notes
        .create("alice", new_note(folder.folder.id, "Heapify"))
        .await
        .unwrap();
    let top_k = svc
        .notes
        .create("alice", new_note(folder.folder.id, "Top K"))
        .await
        .unwrap();

    persistence.fail_removal_of([heapify.id, top_k.id]);
    let err = svc.note_folders.delete("alice", folder.folder.id).await.unwrap_err();
    match err {
        ServiceError::CascadeIncomplete { failed, .. } => assert_eq!(failed, 2),
        other => panic!("unexpected error: {other}"),
    }
    // the folder is gone even though its notes survived
    assert!(svc.note_folders.list("alice").await.is_empty());
    assert_eq!(persistence.inner.len(Collection::Notes), 2);

    persistence.heal();
    let report = svc.repair().await;
    assert_eq!(report.notes, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(persistence.inner.len(Collection::Notes), 0);
    assert!(svc
        .notes
        .list("alice", &NoteQuery::default())
        .await
        .unwrap()
        .is_empty());

    assert_eq!(svc.repair().await.removed(), 0);
}

#[tokio::test]
async fn failed_question_cascade_closes_the_orphaned_subfolder() {
    let persistence = Arc::new(FlakyPersistence::default());
    let svc = Services::new(Store::with_persistence(persistence.clone()).unwrap().shared());
    let dsa = svc
        .question_folders
        .create("alice", FolderPayload::named("DSA"))
        .await
        .unwrap();
    let dsa = svc
        .question_folders
        .add_subfolder("alice", dsa.id, FolderPayload::named("Arrays"))
        .await
        .unwrap();
    let arrays = dsa.subfolders[0].id;
    let two_sum = svc
        .questions
        .create("alice", new_question(arrays, 1, "Two Sum", Difficulty::Easy))
        .await
        .unwrap();
    svc.questions
        .create("alice", new_question(dsa.id, 2, "LRU Cache", Difficulty::Hard))
        .await
        .unwrap();

    persistence.fail_removal_of([arrays, two_sum.id]);
    let err = svc.question_folders.delete("alice", dsa.id).await.unwrap_err();
    match err {
        ServiceError::CascadeIncomplete { failed, .. } => assert_eq!(failed, 2),
        other => panic!("unexpected error: {other}"),
    }
    assert!(svc.question_folders.list("alice").await.is_empty());
    assert_eq!(persistence.inner.len(Collection::QuestionFolders), 1);

    // the surviving subfolder no longer takes questions
    let err = svc
        .questions
        .create("alice", new_question(arrays, 3, "3Sum", Difficulty::Medium))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ref m) if m == "Folder ID does not refer to a folder"
    ));
    let moved = svc
        .questions
        .update(
            "alice",
            two_sum.id,
            QuestionPatch {
                folder_id: Some(arrays),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(moved, Err(ServiceError::Validation(_))));

    persistence.heal();
    let report = svc.repair().await;
    assert_eq!(report.subfolders, 1);
    assert_eq!(report.questions, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(persistence.inner.len(Collection::QuestionFolders), 0);
    assert_eq!(persistence.inner.len(Collection::Questions), 0);
    assert_eq!(svc.repair().await.removed(), 0);
}

#[tokio::test]
async fn repair_removes_orphans_left_on_disk() {
    let tempdir = tempfile::tempdir().unwrap();
    let svc = Services::new(Store::open(tempdir.path()).unwrap().shared());
    let folder = svc
        .question_folders
        .create("alice", FolderPayload::named("DSA"))
        .await
        .unwrap();
    let folder = svc
        .question_folders
        .add_subfolder("alice", folder.id, FolderPayload::named("Arrays"))
        .await
        .unwrap();
    svc.questions
        .create(
            "alice",
            new_question(folder.subfolders[0].id, 1, "Two Sum", Difficulty::Easy),
        )
        .await
        .unwrap();
    drop(svc);

    // simulate a crash right after the folder record was removed
    std::fs::remove_file(
        tempdir
            .path()
            .join("question_folders")
            .join(format!("{}.json", folder.id)),
    )
    .unwrap();

    let mut store = Store::open(tempdir.path()).unwrap();
    let report = algodeck_core::services::RepairSweep::run(&mut store);
    assert_eq!(report.subfolders, 1);
    assert_eq!(report.questions, 1);
    assert_eq!(store.count::<algodeck_core::models::Question>(), 0);
}
