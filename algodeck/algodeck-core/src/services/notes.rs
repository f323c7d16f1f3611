use super::validate::{self, HEADING_MAX, NOTE_TITLE_MAX};
use crate::error::{ResourceKind, ServiceError, ServiceResult};
use crate::models::{NewNote, Note, NoteFolder, NotePatch, NoteQuery};
use crate::search::SearchKind;
use crate::storage::{SharedStore, Store};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct NoteService {
    store: SharedStore,
}

impl NoteService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The owner's notes matching every supplied filter, pinned first and
    /// then most recently updated first.
    pub async fn list(&self, owner: &str, query: &NoteQuery) -> ServiceResult<Vec<Note>> {
        let store = self.store.read().await;
        let hits: Option<HashSet<Uuid>> = match query.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(
                store
                    .search(owner, SearchKind::Note, text)?
                    .into_iter()
                    .collect(),
            ),
            _ => None,
        };
        let mut notes: Vec<Note> = store
            .scan::<Note>(owner)
            .filter(|n| query.folder_id.map_or(true, |f| n.folder_id == f))
            .filter(|n| hits.as_ref().map_or(true, |h| h.contains(&n.id)))
            .cloned()
            .collect();
        sort_notes(&mut notes);
        Ok(notes)
    }

    pub async fn get(&self, owner: &str, id: Uuid) -> ServiceResult<Note> {
        let store = self.store.read().await;
        find(&store, owner, id).cloned()
    }

    pub async fn create(&self, owner: &str, payload: NewNote) -> ServiceResult<Note> {
        let title = validate::required("Title", payload.title.as_deref(), NOTE_TITLE_MAX)?;
        let folder_id = payload
            .folder_id
            .ok_or_else(|| ServiceError::validation("Folder ID is required"))?;
        let mut note = Note::new(owner, folder_id, title);
        if let Some(heading) = payload.heading.as_deref() {
            note.heading = validate::bounded("Heading", heading, HEADING_MAX)?;
        }
        note.content = payload.content.unwrap_or_default();
        note.tags = validate::tags(payload.tags.unwrap_or_default());

        let mut store = self.store.write().await;
        ensure_folder(&store, owner, folder_id)?;
        store.put(note.clone())?;
        tracing::debug!(note = %note.id, folder = %folder_id, "note created");
        Ok(note)
    }

    /// Apply the supplied fields. Moving to another folder requires that the
    /// folder belongs to the owner.
    pub async fn update(&self, owner: &str, id: Uuid, patch: NotePatch) -> ServiceResult<Note> {
        let mut store = self.store.write().await;
        let mut note = find(&store, owner, id)?.clone();
        if let Some(title) = patch.title.as_deref() {
            note.title = validate::required("Title", Some(title), NOTE_TITLE_MAX)?;
        }
        if let Some(heading) = patch.heading.as_deref() {
            note.heading = validate::bounded("Heading", heading, HEADING_MAX)?;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = validate::tags(tags);
        }
        if let Some(pinned) = patch.is_pinned {
            note.is_pinned = pinned;
        }
        if let Some(folder_id) = patch.folder_id {
            ensure_folder(&store, owner, folder_id)?;
            note.folder_id = folder_id;
        }
        note.updated_at = Utc::now();
        store.put(note.clone())?;
        Ok(note)
    }

    pub async fn toggle_pin(&self, owner: &str, id: Uuid) -> ServiceResult<Note> {
        let mut store = self.store.write().await;
        let mut note = find(&store, owner, id)?.clone();
        note.is_pinned = !note.is_pinned;
        note.updated_at = Utc::now();
        store.put(note.clone())?;
        Ok(note)
    }

    pub async fn delete(&self, owner: &str, id: Uuid) -> ServiceResult<Note> {
        let mut store = self.store.write().await;
        store
            .remove::<Note>(owner, id)?
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Note))
    }
}

/// Pinned first, then most recently updated, ties broken by id.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.updated_at.cmp(&a.updated_at))
            .then(a.id.cmp(&b.id))
    });
}

fn find<'a>(store: &'a Store, owner: &str, id: Uuid) -> ServiceResult<&'a Note> {
    store
        .get::<Note>(owner, id)
        .ok_or_else(|| ServiceError::not_found(ResourceKind::Note))
}

fn ensure_folder(store: &Store, owner: &str, folder_id: Uuid) -> ServiceResult<()> {
    match store.get::<NoteFolder>(owner, folder_id) {
        Some(_) => Ok(()),
        None => Err(ServiceError::validation("Folder ID does not refer to a folder")),
    }
}
