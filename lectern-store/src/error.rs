//! Error types for the store layer.

use crate::store::StoreState;
use lectern_model::DataKind;
use lectern_persist::PersistError;
use lectern_types::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for search collaborator calls.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation issued before `initialize()` completed.
    #[error("{kind} store is not ready (state: {state:?})")]
    NotReady { kind: DataKind, state: StoreState },

    /// Cache accessed from a thread other than the presentation thread.
    #[error("cache accessed outside the presentation context")]
    WrongContext,

    /// `initialize()` called more than once.
    #[error("{0} store already initialized")]
    AlreadyInitialized(DataKind),

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Search index error.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// An import the caller expected to succeed produced no entities.
    #[error("nothing imported from {}: {reason}", path.display())]
    NothingImported { path: PathBuf, reason: String },

    /// No store is registered for the entity type.
    #[error("no persist adapter registered for {0}")]
    AdapterNotFound(DataKind),

    /// A store is already registered for the entity type.
    #[error("persist adapter already registered for {0}")]
    AlreadyRegistered(DataKind),

    /// The presentation thread has shut down.
    #[error("presentation context closed")]
    ContextClosed,

    /// The presentation thread could not be started.
    #[error("failed to start presentation context: {0}")]
    ContextStart(std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl StoreError {
    /// True for errors that indicate a wiring bug rather than a runtime
    /// condition.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::AdapterNotFound(_)
                | Self::AlreadyRegistered(_)
                | Self::Persist(PersistError::UnknownFormat(_))
        )
    }
}

/// Errors reported by a search index collaborator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The index could not be reached or opened.
    #[error("search index unavailable: {0}")]
    Unavailable(String),

    /// The index refused one entity.
    #[error("search index rejected {id}: {message}")]
    Rejected { id: EntityId, message: String },
}
