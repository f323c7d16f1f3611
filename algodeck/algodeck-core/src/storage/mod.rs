//! Owner-scoped record store.
//!
//! Records live in memory, keyed by id, and are written through a
//! [`Persistence`] backend before any in-memory change. Notes and questions
//! are mirrored into a [`SearchIndex`]. Every by-id lookup takes the owner and
//! treats a record of another owner exactly like a missing one.

mod persistence;
#[cfg(test)]
mod tests;

pub use persistence::{Collection, DiskPersistence, MemoryPersistence, Persistence};

use crate::models::{Note, NoteFolder, Question, QuestionFolder};
use crate::search::{SearchEntry, SearchIndex, SearchKind};
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

pub type SharedStore = Arc<RwLock<Store>>;

/// A record type held in one of the store's collections.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
    fn owner(&self) -> &str;
    fn table(store: &Store) -> &HashMap<Uuid, Self>;
    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Self>;

    /// Text to index, for searchable record types.
    fn search_entry(&self) -> Option<SearchEntry<'_>> {
        None
    }
}

pub struct Store {
    note_folders: HashMap<Uuid, NoteFolder>,
    notes: HashMap<Uuid, Note>,
    question_folders: HashMap<Uuid, QuestionFolder>,
    questions: HashMap<Uuid, Question>,
    persistence: Arc<dyn Persistence>,
    search: SearchIndex,
    /// Set when an index update failed after the record change was applied.
    /// The next write rebuilds the index from memory.
    index_stale: bool,
}

impl Store {
    /// Open (or create) a store persisted under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_persistence(Arc::new(DiskPersistence::new(dir)?))
    }

    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Result<Self> {
        Self::with_persistence(Arc::new(MemoryPersistence::new()))
    }

    pub fn with_persistence(persistence: Arc<dyn Persistence>) -> Result<Self> {
        let mut store = Self {
            note_folders: load(persistence.as_ref())?,
            notes: load(persistence.as_ref())?,
            question_folders: load(persistence.as_ref())?,
            questions: load(persistence.as_ref())?,
            persistence,
            search: SearchIndex::new()?,
            index_stale: false,
        };
        store.rebuild_index()?;
        tracing::debug!(
            note_folders = store.note_folders.len(),
            notes = store.notes.len(),
            question_folders = store.question_folders.len(),
            questions = store.questions.len(),
            "store loaded"
        );
        Ok(store)
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Re-index every note and question from the in-memory records.
    pub fn rebuild_index(&mut self) -> Result<()> {
        let entries = self
            .notes
            .values()
            .filter_map(|n| n.search_entry().map(|e| (n.id, n.owner(), e)))
            .chain(
                self.questions
                    .values()
                    .filter_map(|q| q.search_entry().map(|e| (q.id, q.owner(), e))),
            );
        self.search.rebuild(entries)?;
        self.index_stale = false;
        Ok(())
    }

    /// The record `id` if it belongs to `owner`.
    pub fn get<R: Record>(&self, owner: &str, id: Uuid) -> Option<&R> {
        R::table(self).get(&id).filter(|r| r.owner() == owner)
    }

    /// Every record of `owner`, in no particular order.
    pub fn scan<'a, R: Record>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a R> + 'a {
        R::table(self).values().filter(move |r| r.owner() == owner)
    }

    /// Every record regardless of owner. Only maintenance passes use this.
    pub fn all<R: Record>(&self) -> impl Iterator<Item = &R> {
        R::table(self).values()
    }

    pub fn count<R: Record>(&self) -> usize {
        R::table(self).len()
    }

    /// Insert or replace a record: persisted first, then applied in memory,
    /// then indexed. Once persisted the write counts as done; an index
    /// failure only leaves the index stale.
    pub fn put<R: Record>(&mut self, record: R) -> Result<()> {
        let id = record.id();
        let bytes = serde_json::to_vec_pretty(&record)?;
        self.persistence.write(R::COLLECTION, id, &bytes)?;
        R::table_mut(self).insert(id, record);
        let indexed = match R::table(self).get(&id) {
            Some(record) => match record.search_entry() {
                Some(entry) => self.search.upsert(id, record.owner(), &entry),
                None => Ok(()),
            },
            None => Ok(()),
        };
        self.settle_index(id, indexed);
        Ok(())
    }

    /// Remove `owner`'s record `id`. Returns `None` when there is no such
    /// record for this owner. On a persistence failure the record stays.
    pub fn remove<R: Record>(&mut self, owner: &str, id: Uuid) -> Result<Option<R>> {
        if self.get::<R>(owner, id).is_none() {
            return Ok(None);
        }
        self.persistence.remove(R::COLLECTION, id)?;
        let removed = R::table_mut(self).remove(&id);
        let indexed = if removed.as_ref().and_then(|r| r.search_entry()).is_some() {
            self.search.remove(id)
        } else {
            Ok(())
        };
        self.settle_index(id, indexed);
        Ok(removed)
    }

    /// Record the outcome of an index update for `id`, rebuilding a stale
    /// index once updates succeed again.
    fn settle_index(&mut self, id: Uuid, indexed: Result<()>) {
        if let Err(e) = indexed {
            tracing::error!(record = %id, error = %format!("{e:#}"), "search index update failed");
            self.index_stale = true;
            return;
        }
        if self.index_stale {
            match self.rebuild_index() {
                Ok(()) => tracing::info!("search index rebuilt"),
                Err(e) => tracing::error!(error = %format!("{e:#}"), "search index rebuild failed"),
            }
        }
    }

    /// Ids of `owner`'s records of `kind` matching `text`, best first.
    pub fn search(&self, owner: &str, kind: SearchKind, text: &str) -> Result<Vec<Uuid>> {
        let limit = match kind {
            SearchKind::Note => self.notes.len(),
            SearchKind::Question => self.questions.len(),
        };
        self.search.search(owner, kind, text, limit)
    }
}

fn load<R: Record>(persistence: &dyn Persistence) -> Result<HashMap<Uuid, R>> {
    let mut records = HashMap::new();
    for (id, bytes) in persistence.load(R::COLLECTION)? {
        match serde_json::from_slice::<R>(&bytes) {
            Ok(record) if record.id() == id => {
                records.insert(id, record);
            }
            Ok(_) => tracing::warn!(
                collection = R::COLLECTION.as_str(),
                %id,
                "record id does not match its key, skipping"
            ),
            Err(e) => tracing::warn!(
                collection = R::COLLECTION.as_str(),
                %id,
                error = %e,
                "unreadable record, skipping"
            ),
        }
    }
    Ok(records)
}

impl Record for NoteFolder {
    const COLLECTION: Collection = Collection::NoteFolders;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn table(store: &Store) -> &HashMap<Uuid, Self> {
        &store.note_folders
    }

    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Self> {
        &mut store.note_folders
    }
}

impl Record for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn table(store: &Store) -> &HashMap<Uuid, Self> {
        &store.notes
    }

    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Self> {
        &mut store.notes
    }

    fn search_entry(&self) -> Option<SearchEntry<'_>> {
        Some(SearchEntry {
            kind: SearchKind::Note,
            title: &self.title,
            body: vec![&self.heading, &self.content],
            tags: &self.tags,
        })
    }
}

impl Record for QuestionFolder {
    const COLLECTION: Collection = Collection::QuestionFolders;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn table(store: &Store) -> &HashMap<Uuid, Self> {
        &store.question_folders
    }

    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Self> {
        &mut store.question_folders
    }
}

impl Record for Question {
    const COLLECTION: Collection = Collection::Questions;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn table(store: &Store) -> &HashMap<Uuid, Self> {
        &store.questions
    }

    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Self> {
        &mut store.questions
    }

    fn search_entry(&self) -> Option<SearchEntry<'_>> {
        Some(SearchEntry {
            kind: SearchKind::Question,
            title: &self.title,
            body: vec![&self.notes],
            tags: &self.tags,
        })
    }
}
