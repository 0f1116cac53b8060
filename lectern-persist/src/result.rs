//! Outcome types for read and import operations.

use crate::error::PersistError;

/// One entity read by a format provider, plus anything odd noticed on the
/// way (for example an older format version).
#[derive(Debug, Clone, PartialEq)]
pub struct DataReadResult<T> {
    pub data: T,
    pub warnings: Vec<String>,
}

impl<T> DataReadResult<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(data: T, warnings: Vec<String>) -> Self {
        Self { data, warnings }
    }
}

/// Accumulated outcome of one import call.
///
/// Recursive imports (archive contents) each produce their own result which
/// the caller folds in with [`DataImportResult::add`]; partial successes are
/// never lost. Callers must inspect [`warnings`](Self::warnings) and
/// [`errors`](Self::errors) even when entities were imported.
#[derive(Debug)]
pub struct DataImportResult<T> {
    created: Vec<T>,
    updated: Vec<T>,
    warnings: Vec<String>,
    errors: Vec<PersistError>,
}

impl<T> DataImportResult<T> {
    pub fn new() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Merges `other` into this result.
    pub fn add(&mut self, other: DataImportResult<T>) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    pub fn record_created(&mut self, item: T) {
        self.created.push(item);
    }

    pub fn record_updated(&mut self, item: T) {
        self.updated.push(item);
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn record_error(&mut self, error: PersistError) {
        self.errors.push(error);
    }

    /// True when nothing was created or updated. Warnings and errors do
    /// not count.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.warnings.is_empty() || !self.errors.is_empty()
    }

    pub fn created(&self) -> &[T] {
        &self.created
    }

    pub fn updated(&self) -> &[T] {
        &self.updated
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[PersistError] {
        &self.errors
    }

    /// `(created, updated, warnings, errors)`.
    pub fn into_parts(self) -> (Vec<T>, Vec<T>, Vec<String>, Vec<PersistError>) {
        (self.created, self.updated, self.warnings, self.errors)
    }
}

impl<T> Default for DataImportResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_partial_successes() {
        let mut top = DataImportResult::new();
        top.record_created("a");

        let mut nested = DataImportResult::new();
        nested.record_updated("b");
        nested.record_warning("skipped c");
        nested.record_error(PersistError::InvalidData("bad d".into()));

        top.add(nested);
        assert_eq!(top.created(), &["a"]);
        assert_eq!(top.updated(), &["b"]);
        assert_eq!(top.warnings().len(), 1);
        assert_eq!(top.errors().len(), 1);
        assert!(!top.is_empty());
        assert!(top.has_failures());
    }

    #[test]
    fn warnings_alone_are_empty() {
        let mut result: DataImportResult<()> = DataImportResult::default();
        result.record_warning("nothing understood");
        assert!(result.is_empty());
        assert!(result.has_failures());
    }
}
