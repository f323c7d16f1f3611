//! Entities, wire views and request payloads shared by the server and the
//! client cache. All wire names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteFolder {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteFolder {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A note folder together with the number of notes currently filed in it.
/// The count is computed when the view is built and never stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteFolderView {
    #[serde(flatten)]
    pub folder: NoteFolder,
    pub note_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub user_id: String,
    pub folder_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(user_id: impl Into<String>, folder_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            folder_id,
            title: title.into(),
            heading: String::new(),
            content: String::new(),
            tags: Vec::new(),
            is_pinned: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Distinguishes top-level question folders from their subfolders.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Folder,
    Subfolder,
}

/// Question folders and subfolders share one record shape. A subfolder
/// carries the id of its top-level parent; nesting is one level deep.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFolder {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: FolderKind,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Append order among the parent's subfolders.
    #[serde(default)]
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionFolder {
    pub fn top_level(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            kind: FolderKind::Folder,
            parent_id: None,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subfolder(parent: &QuestionFolder, name: impl Into<String>, position: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: parent.user_id.clone(),
            name: name.into(),
            kind: FolderKind::Subfolder,
            parent_id: Some(parent.id),
            position,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.kind == FolderKind::Folder
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubfolderView {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a top-level question folder with its subfolders embedded
/// in append order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFolderView {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subfolders: Vec<SubfolderView>,
}

impl QuestionFolderView {
    pub fn assemble<'a>(
        folder: &QuestionFolder,
        subfolders: impl IntoIterator<Item = &'a QuestionFolder>,
    ) -> Self {
        let mut subs: Vec<&QuestionFolder> = subfolders
            .into_iter()
            .filter(|s| s.parent_id == Some(folder.id))
            .collect();
        subs.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Self {
            id: folder.id,
            user_id: folder.user_id.clone(),
            name: folder.name.clone(),
            created_at: folder.created_at,
            updated_at: folder.updated_at,
            subfolders: subs
                .into_iter()
                .map(|s| SubfolderView {
                    id: s.id,
                    name: s.name.clone(),
                    created_at: s.created_at,
                })
                .collect(),
        }
    }

    /// The folder's own id followed by every subfolder id.
    pub fn folder_ids(&self) -> Vec<Uuid> {
        std::iter::once(self.id)
            .chain(self.subfolders.iter().map(|s| s.id))
            .collect()
    }
}

#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// A practice question. Completion is held as a single optional timestamp so
/// `isCompleted` and `completedAt` cannot disagree; both are emitted on the
/// wire and an inconsistent pair is rejected when decoding.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "QuestionRecord", try_from = "QuestionRecord")]
pub struct Question {
    pub id: Uuid,
    pub user_id: String,
    pub folder_id: Uuid,
    pub question_number: i64,
    pub title: String,
    pub difficulty: Difficulty,
    pub link: String,
    pub tags: Vec<String>,
    pub notes: String,
    completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn new(user_id: impl Into<String>, folder_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            folder_id,
            question_number: 0,
            title: title.into(),
            difficulty: Difficulty::default(),
            link: String::new(),
            tags: Vec::new(),
            notes: String::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Flip completion. Becoming complete stamps `now`; becoming incomplete
    /// clears the stamp.
    pub fn toggle_completion(&mut self, now: DateTime<Utc>) {
        self.completed_at = match self.completed_at {
            Some(_) => None,
            None => Some(now),
        };
        self.updated_at = now;
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    id: Uuid,
    user_id: String,
    folder_id: Uuid,
    #[serde(default)]
    question_number: i64,
    title: String,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    link: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        Self {
            is_completed: q.is_completed(),
            id: q.id,
            user_id: q.user_id,
            folder_id: q.folder_id,
            question_number: q.question_number,
            title: q.title,
            difficulty: q.difficulty,
            link: q.link,
            tags: q.tags,
            notes: q.notes,
            completed_at: q.completed_at,
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

impl TryFrom<QuestionRecord> for Question {
    type Error = String;

    fn try_from(r: QuestionRecord) -> Result<Self, Self::Error> {
        if r.is_completed != r.completed_at.is_some() {
            return Err(format!(
                "question {}: isCompleted and completedAt disagree",
                r.id
            ));
        }
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            folder_id: r.folder_id,
            question_number: r.question_number,
            title: r.title,
            difficulty: r.difficulty,
            link: r.link,
            tags: r.tags,
            notes: r.notes,
            completed_at: r.completed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Body of folder create/rename and subfolder append calls.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FolderPayload {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Partial note update: only supplied fields change.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial question update. Completion is not patchable; it only moves
/// through the completion toggle.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteQuery {
    pub folder_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuestionQuery {
    pub folder_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyBucket {
    pub total: usize,
    pub completed: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ByDifficulty {
    pub easy: DifficultyBucket,
    pub medium: DifficultyBucket,
    pub hard: DifficultyBucket,
}

impl ByDifficulty {
    pub fn bucket_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyBucket {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub total: usize,
    pub completed: usize,
    pub completion_rate: u32,
    pub by_difficulty: ByDifficulty,
}

impl QuestionStats {
    /// Count questions by completion and difficulty. A bucket's `completed`
    /// can never exceed its `total` since both come from the same pass.
    pub fn tally<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut stats = Self::default();
        for q in questions {
            let bucket = stats.by_difficulty.bucket_mut(q.difficulty);
            bucket.total += 1;
            stats.total += 1;
            if q.is_completed() {
                bucket.completed += 1;
                stats.completed += 1;
            }
        }
        stats.completion_rate = completion_rate(stats.completed, stats.total);
        stats
    }
}

/// Rounded integer percentage; zero when there is nothing to complete.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}
