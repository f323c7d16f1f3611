//! Typed failures returned by the resource services.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Entity family a failure refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    NoteFolder,
    Note,
    QuestionFolder,
    Question,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::NoteFolder | ResourceKind::QuestionFolder => "Folder",
            ResourceKind::Note => "Note",
            ResourceKind::Question => "Question",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field is missing, blank, too long or malformed.
    #[error("{0}")]
    Validation(String),

    /// The id does not exist for this owner. Never distinguishes "absent"
    /// from "owned by someone else".
    #[error("{kind} not found")]
    NotFound { kind: ResourceKind },

    /// The folder record is gone but some dependents survived. A repair
    /// sweep removes them.
    #[error("{kind} {folder} was deleted but {failed} dependent record(s) could not be removed")]
    CascadeIncomplete {
        kind: ResourceKind,
        folder: Uuid,
        failed: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: ResourceKind) -> Self {
        Self::NotFound { kind }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
