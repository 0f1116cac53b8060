//! Error types for the persistence layer.

use lectern_types::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur in persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// `create` found a file at the entity's canonical path.
    #[error("entity {id} already exists at {}", path.display())]
    AlreadyExists { id: EntityId, path: PathBuf },

    /// No provider is registered for the requested format.
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// Import was pointed at something other than a regular file.
    #[error("not a regular file: {}", .0.display())]
    NotARegularFile(PathBuf),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Archive read/write error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Content did not match what the provider expects.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A provider failed while importing one file.
    #[error("provider '{provider}' failed on {}: {message}", path.display())]
    Provider {
        provider: String,
        path: PathBuf,
        message: String,
    },
}

/// Coarse classification of [`PersistError`] for callers that branch on
/// the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistErrorKind {
    Collision,
    UnknownFormat,
    Precondition,
    Io,
    Format,
}

impl PersistError {
    pub fn kind(&self) -> PersistErrorKind {
        match self {
            Self::AlreadyExists { .. } => PersistErrorKind::Collision,
            Self::UnknownFormat(_) => PersistErrorKind::UnknownFormat,
            Self::NotARegularFile(_) => PersistErrorKind::Precondition,
            Self::Io(_) | Self::Zip(_) => PersistErrorKind::Io,
            Self::Serialization(_) | Self::InvalidData(_) | Self::Provider { .. } => {
                PersistErrorKind::Format
            }
        }
    }

    /// True when `create` refused to overwrite an existing record.
    pub fn is_collision(&self) -> bool {
        self.kind() == PersistErrorKind::Collision
    }
}
