//! Per-type summaries of a fan-out import.
//!
//! [`DataManager::import_data`](crate::DataManager::import_data) returns one
//! [`ImportReport`] per entity type that recognized the file. Entities are
//! reduced to their identities and errors to their messages.

use lectern_model::{DataKind, Persistable};
use lectern_persist::DataImportResult;
use lectern_types::EntityId;

/// Outcome of a multi-type import for one entity type, without the
/// entities themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub kind: DataKind,
    pub created: Vec<EntityId>,
    pub updated: Vec<EntityId>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn from_result<T: Persistable>(result: &DataImportResult<T>) -> Self {
        Self {
            kind: T::KIND,
            created: result.created().iter().map(Persistable::id).collect(),
            updated: result.updated().iter().map(Persistable::id).collect(),
            warnings: result.warnings().to_vec(),
            errors: result.errors().iter().map(ToString::to_string).collect(),
        }
    }

    /// Number of entities created or updated.
    pub fn imported(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.warnings.is_empty() || !self.errors.is_empty()
    }
}
