//! Where the store's records live between restarts.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    path::PathBuf,
};
use uuid::Uuid;

/// The four record collections held by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    NoteFolders,
    Notes,
    QuestionFolders,
    Questions,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::NoteFolders,
        Collection::Notes,
        Collection::QuestionFolders,
        Collection::Questions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::NoteFolders => "note_folders",
            Collection::Notes => "notes",
            Collection::QuestionFolders => "question_folders",
            Collection::Questions => "questions",
        }
    }
}

/// Durable byte storage for serialized records, keyed by collection and id.
/// `remove` of an absent record succeeds.
pub trait Persistence: Send + Sync {
    fn load(&self, collection: Collection) -> Result<Vec<(Uuid, Vec<u8>)>>;
    fn write(&self, collection: Collection, id: Uuid, bytes: &[u8]) -> Result<()>;
    fn remove(&self, collection: Collection, id: Uuid) -> Result<()>;
}

/// One JSON file per record under `<dir>/<collection>/<id>.json`.
pub struct DiskPersistence {
    dir: PathBuf,
}

impl DiskPersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        for collection in Collection::ALL {
            std::fs::create_dir_all(dir.join(collection.as_str()))
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(Self { dir })
    }

    fn path(&self, collection: Collection, id: Uuid) -> PathBuf {
        self.dir
            .join(collection.as_str())
            .join(format!("{}.json", id))
    }
}

impl Persistence for DiskPersistence {
    fn load(&self, collection: Collection) -> Result<Vec<(Uuid, Vec<u8>)>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(self.dir.join(collection.as_str()))? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("json")
            {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                continue;
            };
            out.push((id, std::fs::read(&path)?));
        }
        Ok(out)
    }

    fn write(&self, collection: Collection, id: Uuid, bytes: &[u8]) -> Result<()> {
        let path = self.path(collection, id);
        // write-then-rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, collection: Collection, id: Uuid) -> Result<()> {
        let path = self.path(collection, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }
}

/// Keeps serialized records in memory. Sharing one instance between two
/// stores behaves like reopening the same data directory.
#[derive(Default)]
pub struct MemoryPersistence {
    records: Mutex<HashMap<(Collection, Uuid), Vec<u8>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.records
            .lock()
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, collection: Collection) -> Result<Vec<(Uuid, Vec<u8>)>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|((_, id), bytes)| (*id, bytes.clone()))
            .collect())
    }

    fn write(&self, collection: Collection, id: Uuid, bytes: &[u8]) -> Result<()> {
        self.records.lock().insert((collection, id), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, collection: Collection, id: Uuid) -> Result<()> {
        self.records.lock().remove(&(collection, id));
        Ok(())
    }
}
