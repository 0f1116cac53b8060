//! Search index collaborator.
//!
//! The store forwards every mutation to a [`SearchIndex`] from the same
//! background task that wrote the file. How results are computed is not
//! this crate's concern.

use crate::error::SearchResult;

/// Receives entity mutations to keep a search index current.
///
/// Calls are synchronous and run on a blocking worker, never on the
/// presentation thread.
pub trait SearchIndex<T>: Send + Sync {
    fn create(&self, item: &T) -> SearchResult<()>;

    fn update(&self, item: &T) -> SearchResult<()>;

    fn delete(&self, item: &T) -> SearchResult<()>;
}

/// Index that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearchIndex;

impl<T> SearchIndex<T> for NoopSearchIndex {
    fn create(&self, _item: &T) -> SearchResult<()> {
        Ok(())
    }

    fn update(&self, _item: &T) -> SearchResult<()> {
        Ok(())
    }

    fn delete(&self, _item: &T) -> SearchResult<()> {
        Ok(())
    }
}
