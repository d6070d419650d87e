use std::fmt;

use thiserror::Error;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    Malformed(String),
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use StorageError::*;
        match self {
            Io(e) => Some(e),
            Serialize(e) => Some(e),
            Malformed(_) => None,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StorageError::*;
        match self {
            Io(e) => write!(f, "Io: {}", e),
            Serialize(e) => write!(f, "Serialize: {}", e),
            Malformed(s) => write!(f, "Malformed: {}", s),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialize(error)
    }
}

/// Errors surfaced by the highlight subsystem. None of them are fatal; callers
/// report them to the reader and carry on.
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("cannot highlight this selection")]
    NotFound,

    #[error("selection overlaps existing highlight {existing}")]
    Overlap { existing: String },

    #[error("highlight {id} already exists")]
    DuplicateId { id: String },

    #[error("invalid span {start}..{end}")]
    InvalidSpan { start: usize, end: usize },

    #[error("highlight belongs to article {found}, expected {expected}")]
    ArticleMismatch { expected: String, found: String },

    #[error("no pending selection")]
    NothingPending,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    #[error("article not found: {0}")]
    ArticleNotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
