//! Resource services: one per entity family, plus aggregation and repair.
//!
//! Every operation takes the caller's owner id and only ever sees that
//! owner's records. Mutations hold the store's write lock for the whole
//! read-modify-write, so each request applies as one unit; concurrent
//! requests on the same record resolve last-write-wins.

mod cascade;
mod note_folders;
mod notes;
mod question_folders;
mod questions;
mod repair;
mod stats;
mod validate;

pub use cascade::CascadeReport;
pub use note_folders::NoteFolderService;
pub use notes::{sort_notes, NoteService};
pub use question_folders::QuestionFolderService;
pub use questions::{sort_questions, QuestionService};
pub use repair::{RepairReport, RepairSweep};
pub use stats::StatsService;

use crate::storage::SharedStore;

/// All services over one shared store.
#[derive(Clone)]
pub struct Services {
    pub note_folders: NoteFolderService,
    pub notes: NoteService,
    pub question_folders: QuestionFolderService,
    pub questions: QuestionService,
    pub stats: StatsService,
    store: SharedStore,
}

impl Services {
    pub fn new(store: SharedStore) -> Self {
        Self {
            note_folders: NoteFolderService::new(store.clone()),
            notes: NoteService::new(store.clone()),
            question_folders: QuestionFolderService::new(store.clone()),
            questions: QuestionService::new(store.clone()),
            stats: StatsService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Remove records left behind by interrupted cascades.
    pub async fn repair(&self) -> RepairReport {
        let mut store = self.store.write().await;
        RepairSweep::run(&mut store)
    }
}
