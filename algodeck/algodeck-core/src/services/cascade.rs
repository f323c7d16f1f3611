//! Cascading folder deletion.
//!
//! 1. Locate the folder by `(owner, id)`; absent means NotFound and nothing
//!    else happens.
//! 2. Remove the folder record.
//! 3. Note folder: remove every note of the owner filed in it.
//! 4. Question folder: collect its subfolder ids as they are now, remove those
//!    subfolders, then remove every question of the owner filed in the folder
//!    or any collected subfolder.
//!
//! Steps 3 and 4 attempt every removal even after one fails and never put
//! back what was already removed. Any failure is reported as
//! `CascadeIncomplete`; the survivors no longer resolve to a folder, so
//! [`RepairSweep`](super::RepairSweep) finds and removes them.

use crate::error::{ResourceKind, ServiceError, ServiceResult};
use crate::models::{Note, NoteFolder, Question, QuestionFolder};
use crate::storage::{Record, Store};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// What a folder delete removed besides the folder itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub notes: usize,
    pub subfolders: usize,
    pub questions: usize,
}

/// Forward-only removal that keeps going past failures.
#[derive(Default)]
pub(crate) struct Sweep {
    pub(crate) failed: usize,
    first_error: Option<anyhow::Error>,
}

impl Sweep {
    pub(crate) fn remove_one<R: Record>(&mut self, store: &mut Store, owner: &str, id: Uuid) -> bool {
        match store.remove::<R>(owner, id) {
            Ok(removed) => removed.is_some(),
            Err(e) => {
                tracing::error!(
                    collection = R::COLLECTION.as_str(),
                    %id,
                    error = %e,
                    "failed to remove dependent record"
                );
                self.failed += 1;
                self.first_error.get_or_insert(e);
                false
            }
        }
    }

    pub(crate) fn remove_all<R: Record>(&mut self, store: &mut Store, owner: &str, ids: &[Uuid]) -> usize {
        ids.iter()
            .filter(|id| self.remove_one::<R>(store, owner, **id))
            .count()
    }

    fn finish(
        self,
        kind: ResourceKind,
        folder: Uuid,
        report: CascadeReport,
    ) -> ServiceResult<CascadeReport> {
        match self.first_error {
            None => Ok(report),
            Some(source) => Err(ServiceError::CascadeIncomplete {
                kind,
                folder,
                failed: self.failed,
                source,
            }),
        }
    }
}

pub(crate) fn delete_note_folder(
    store: &mut Store,
    owner: &str,
    id: Uuid,
) -> ServiceResult<CascadeReport> {
    if store.get::<NoteFolder>(owner, id).is_none() {
        return Err(ServiceError::not_found(ResourceKind::NoteFolder));
    }
    store.remove::<NoteFolder>(owner, id)?;

    let notes: Vec<Uuid> = store
        .scan::<Note>(owner)
        .filter(|n| n.folder_id == id)
        .map(|n| n.id)
        .collect();
    let mut sweep = Sweep::default();
    let report = CascadeReport {
        notes: sweep.remove_all::<Note>(store, owner, &notes),
        ..Default::default()
    };
    tracing::info!(folder = %id, notes = report.notes, failed = sweep.failed, "note folder deleted");
    sweep.finish(ResourceKind::NoteFolder, id, report)
}

pub(crate) fn delete_question_folder(
    store: &mut Store,
    owner: &str,
    id: Uuid,
) -> ServiceResult<CascadeReport> {
    let exists = store
        .get::<QuestionFolder>(owner, id)
        .is_some_and(QuestionFolder::is_top_level);
    if !exists {
        return Err(ServiceError::not_found(ResourceKind::QuestionFolder));
    }
    let subfolders: Vec<Uuid> = store
        .scan::<QuestionFolder>(owner)
        .filter(|f| f.parent_id == Some(id))
        .map(|f| f.id)
        .collect();
    store.remove::<QuestionFolder>(owner, id)?;

    let mut sweep = Sweep::default();
    let mut report = CascadeReport {
        subfolders: sweep.remove_all::<QuestionFolder>(store, owner, &subfolders),
        ..Default::default()
    };
    let targets: HashSet<Uuid> = std::iter::once(id).chain(subfolders).collect();
    let questions: Vec<Uuid> = store
        .scan::<Question>(owner)
        .filter(|q| targets.contains(&q.folder_id))
        .map(|q| q.id)
        .collect();
    report.questions = sweep.remove_all::<Question>(store, owner, &questions);
    tracing::info!(
        folder = %id,
        subfolders = report.subfolders,
        questions = report.questions,
        failed = sweep.failed,
        "question folder deleted"
    );
    sweep.finish(ResourceKind::QuestionFolder, id, report)
}
