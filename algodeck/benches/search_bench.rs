use algodeck_core::models::{Difficulty, FolderPayload, NewNote, NewQuestion, NoteQuery, QuestionQuery};
use algodeck_core::{Services, Store};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_listing_and_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let services = Services::new(Store::in_memory().unwrap().shared());
    rt.block_on(async {
        let notes = services
            .note_folders
            .create("user1", FolderPayload::named("Bench"))
            .await
            .unwrap();
        let questions = services
            .question_folders
            .create("user1", FolderPayload::named("Bench"))
            .await
            .unwrap();
        for i in 0..200 {
            services
                .notes
                .create(
                    "user1",
                    NewNote {
                        folder_id: Some(notes.folder.id),
                        title: Some(format!("note {i}")),
                        content: Some(format!("binary search tree rotation {i}")),
                        tags: Some(vec!["tree".into()]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            services
                .questions
                .create(
                    "user1",
                    NewQuestion {
                        folder_id: Some(questions.id),
                        question_number: Some(i),
                        title: Some(format!("question {i}")),
                        difficulty: Some(Difficulty::ALL[i as usize % 3]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
    });

    c.bench_function("list_notes", |b| {
        b.iter(|| rt.block_on(services.notes.list("user1", &NoteQuery::default())).unwrap())
    });

    let search = NoteQuery {
        search: Some("rotation tree".into()),
        ..Default::default()
    };
    c.bench_function("search_notes", |b| {
        b.iter(|| rt.block_on(services.notes.list("user1", &search)).unwrap())
    });

    c.bench_function("list_questions_by_difficulty", |b| {
        let query = QuestionQuery {
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        };
        b.iter(|| rt.block_on(services.questions.list("user1", &query)).unwrap())
    });

    c.bench_function("stats", |b| b.iter(|| rt.block_on(services.stats.stats("user1"))));
}

criterion_group!(benches, bench_listing_and_search);
criterion_main!(benches);
