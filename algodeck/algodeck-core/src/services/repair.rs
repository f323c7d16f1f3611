//! Orphan repair: removes dependents whose folder no longer exists for the
//! same owner. Idempotent; a second run on a repaired store finds nothing.

use super::cascade::Sweep;
use super::question_folders::accepts_questions;
use crate::models::{Note, NoteFolder, Question, QuestionFolder};
use crate::storage::{Record, Store};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub subfolders: usize,
    pub notes: usize,
    pub questions: usize,
    /// Orphans that could not be removed this time.
    pub failed: usize,
}

impl RepairReport {
    pub fn removed(&self) -> usize {
        self.subfolders + self.notes + self.questions
    }
}

pub struct RepairSweep;

impl RepairSweep {
    pub fn run(store: &mut Store) -> RepairReport {
        let mut sweep = Sweep::default();

        // Subfolders go first so the questions filed in them are orphans by
        // the time questions are checked.
        let subfolders = orphans(store, |f: &QuestionFolder| !accepts_questions(store, f));
        let subfolders = remove_each::<QuestionFolder>(&mut sweep, store, &subfolders);

        let notes = orphans(store, |n: &Note| {
            store.get::<NoteFolder>(&n.user_id, n.folder_id).is_none()
        });
        let notes = remove_each::<Note>(&mut sweep, store, &notes);

        let questions = orphans(store, |q: &Question| {
            !store
                .get::<QuestionFolder>(&q.user_id, q.folder_id)
                .is_some_and(|f| accepts_questions(store, f))
        });
        let questions = remove_each::<Question>(&mut sweep, store, &questions);

        let report = RepairReport {
            subfolders,
            notes,
            questions,
            failed: sweep.failed,
        };
        if report.removed() > 0 || report.failed > 0 {
            tracing::warn!(
                subfolders = report.subfolders,
                notes = report.notes,
                questions = report.questions,
                failed = report.failed,
                "repair sweep removed orphaned records"
            );
        } else {
            tracing::debug!("repair sweep found no orphans");
        }
        report
    }
}

fn orphans<R: Record>(store: &Store, is_orphan: impl Fn(&R) -> bool) -> Vec<(String, Uuid)> {
    store
        .all::<R>()
        .filter(|r| is_orphan(r))
        .map(|r| (r.owner().to_string(), r.id()))
        .collect()
}

fn remove_each<R: Record>(sweep: &mut Sweep, store: &mut Store, targets: &[(String, Uuid)]) -> usize {
    targets
        .iter()
        .filter(|(owner, id)| sweep.remove_one::<R>(store, owner, *id))
        .count()
}
