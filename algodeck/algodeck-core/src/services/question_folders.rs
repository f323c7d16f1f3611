use super::cascade::{self, CascadeReport};
use super::validate::{self, FOLDER_NAME_MAX};
use crate::error::{ResourceKind, ServiceError, ServiceResult};
use crate::models::{FolderPayload, QuestionFolder, QuestionFolderView};
use crate::storage::{SharedStore, Store};
use chrono::Utc;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuestionFolderService {
    store: SharedStore,
}

impl QuestionFolderService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Top-level folders, newest first, with subfolders embedded.
    pub async fn list(&self, owner: &str) -> Vec<QuestionFolderView> {
        let store = self.store.read().await;
        let mut top: Vec<&QuestionFolder> = store
            .scan::<QuestionFolder>(owner)
            .filter(|f| f.is_top_level())
            .collect();
        top.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        top.into_iter()
            .map(|f| QuestionFolderView::assemble(f, store.scan::<QuestionFolder>(owner)))
            .collect()
    }

    pub async fn get(&self, owner: &str, id: Uuid) -> ServiceResult<QuestionFolderView> {
        let store = self.store.read().await;
        view(&store, owner, id)
    }

    pub async fn create(
        &self,
        owner: &str,
        payload: FolderPayload,
    ) -> ServiceResult<QuestionFolderView> {
        let name = validate::required("Folder name", payload.name.as_deref(), FOLDER_NAME_MAX)?;
        let folder = QuestionFolder::top_level(owner, name);
        let id = folder.id;
        let mut store = self.store.write().await;
        store.put(folder)?;
        tracing::debug!(folder = %id, "question folder created");
        view(&store, owner, id)
    }

    /// Append a subfolder after the folder's existing ones.
    pub async fn add_subfolder(
        &self,
        owner: &str,
        id: Uuid,
        payload: FolderPayload,
    ) -> ServiceResult<QuestionFolderView> {
        let mut store = self.store.write().await;
        let parent = top_level(&store, owner, id)?.clone();
        let name = validate::required("Subfolder name", payload.name.as_deref(), FOLDER_NAME_MAX)?;
        let position = store
            .scan::<QuestionFolder>(owner)
            .filter(|f| f.parent_id == Some(id))
            .map(|f| f.position + 1)
            .max()
            .unwrap_or(0);
        let subfolder = QuestionFolder::subfolder(&parent, name, position);
        tracing::debug!(folder = %id, subfolder = %subfolder.id, position, "subfolder appended");
        store.put(subfolder)?;
        view(&store, owner, id)
    }

    /// Rename. A payload without a name changes nothing.
    pub async fn rename(
        &self,
        owner: &str,
        id: Uuid,
        payload: FolderPayload,
    ) -> ServiceResult<QuestionFolderView> {
        let mut store = self.store.write().await;
        let mut folder = top_level(&store, owner, id)?.clone();
        if let Some(name) = payload.name.as_deref() {
            folder.name = validate::required("Folder name", Some(name), FOLDER_NAME_MAX)?;
            folder.updated_at = Utc::now();
            store.put(folder)?;
        }
        view(&store, owner, id)
    }

    /// Delete the folder, its subfolders and every question filed in any of them.
    pub async fn delete(&self, owner: &str, id: Uuid) -> ServiceResult<CascadeReport> {
        let mut store = self.store.write().await;
        cascade::delete_question_folder(&mut store, owner, id)
    }
}

/// Subfolders are not addressable as folders.
fn top_level<'a>(store: &'a Store, owner: &str, id: Uuid) -> ServiceResult<&'a QuestionFolder> {
    store
        .get::<QuestionFolder>(owner, id)
        .filter(|f| f.is_top_level())
        .ok_or_else(|| ServiceError::not_found(ResourceKind::QuestionFolder))
}

/// Whether questions may be filed in `folder`: a top-level folder, or a
/// subfolder whose parent is still a top-level folder of the same owner.
pub(crate) fn accepts_questions(store: &Store, folder: &QuestionFolder) -> bool {
    if folder.is_top_level() {
        return true;
    }
    folder.parent_id.is_some_and(|parent| {
        store
            .get::<QuestionFolder>(&folder.user_id, parent)
            .is_some_and(QuestionFolder::is_top_level)
    })
}

fn view(store: &Store, owner: &str, id: Uuid) -> ServiceResult<QuestionFolderView> {
    let folder = top_level(store, owner, id)?;
    Ok(QuestionFolderView::assemble(
        folder,
        store.scan::<QuestionFolder>(owner),
    ))
}
