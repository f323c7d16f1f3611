use super::cascade::{self, CascadeReport};
use super::validate::{self, FOLDER_NAME_MAX};
use crate::error::{ResourceKind, ServiceError, ServiceResult};
use crate::models::{FolderPayload, Note, NoteFolder, NoteFolderView};
use crate::storage::{SharedStore, Store};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct NoteFolderService {
    store: SharedStore,
}

impl NoteFolderService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The owner's folders, newest first, each with its current note count.
    pub async fn list(&self, owner: &str) -> Vec<NoteFolderView> {
        let store = self.store.read().await;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for note in store.scan::<Note>(owner) {
            *counts.entry(note.folder_id).or_default() += 1;
        }
        let mut folders: Vec<NoteFolderView> = store
            .scan::<NoteFolder>(owner)
            .map(|f| NoteFolderView {
                note_count: counts.get(&f.id).copied().unwrap_or(0),
                folder: f.clone(),
            })
            .collect();
        folders.sort_by(|a, b| {
            b.folder
                .created_at
                .cmp(&a.folder.created_at)
                .then(a.folder.id.cmp(&b.folder.id))
        });
        folders
    }

    pub async fn get(&self, owner: &str, id: Uuid) -> ServiceResult<NoteFolderView> {
        let store = self.store.read().await;
        view(&store, owner, id)
    }

    pub async fn create(&self, owner: &str, payload: FolderPayload) -> ServiceResult<NoteFolderView> {
        let name = validate::required("Folder name", payload.name.as_deref(), FOLDER_NAME_MAX)?;
        let folder = NoteFolder::new(owner, name);
        let id = folder.id;
        let mut store = self.store.write().await;
        store.put(folder)?;
        tracing::debug!(folder = %id, "note folder created");
        view(&store, owner, id)
    }

    /// Rename. A payload without a name changes nothing.
    pub async fn rename(
        &self,
        owner: &str,
        id: Uuid,
        payload: FolderPayload,
    ) -> ServiceResult<NoteFolderView> {
        let mut store = self.store.write().await;
        let mut folder = store
            .get::<NoteFolder>(owner, id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ResourceKind::NoteFolder))?;
        if let Some(name) = payload.name.as_deref() {
            folder.name = validate::required("Folder name", Some(name), FOLDER_NAME_MAX)?;
            folder.updated_at = Utc::now();
            store.put(folder)?;
        }
        view(&store, owner, id)
    }

    /// Delete the folder and every note filed in it.
    pub async fn delete(&self, owner: &str, id: Uuid) -> ServiceResult<CascadeReport> {
        let mut store = self.store.write().await;
        cascade::delete_note_folder(&mut store, owner, id)
    }
}

fn view(store: &Store, owner: &str, id: Uuid) -> ServiceResult<NoteFolderView> {
    let folder = store
        .get::<NoteFolder>(owner, id)
        .ok_or_else(|| ServiceError::not_found(ResourceKind::NoteFolder))?;
    Ok(NoteFolderView {
        note_count: store.scan::<Note>(owner).filter(|n| n.folder_id == id).count(),
        folder: folder.clone(),
    })
}
