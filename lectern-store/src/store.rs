//! Observable cache over one persist adapter.
//!
//! Every mutation runs in two phases: the adapter write and the search
//! index call on a blocking worker, then the matching cache change on the
//! presentation context. An operation's future resolves only after the
//! cache reflects it.

use crate::context::PresentationContext;
use crate::error::{StoreError, StoreResult};
use crate::search::SearchIndex;
use lectern_model::{DataKind, Persistable};
use lectern_persist::{DataImportResult, ExportTarget, PersistAdapter};
use lectern_types::EntityId;
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Buffered cache notifications per subscriber before it starts lagging.
const CHANGE_CAPACITY: usize = 256;

/// Lifecycle of a [`PersistentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Emitted on the presentation context after each cache mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheChange {
    Added(EntityId),
    Replaced(EntityId),
    Removed(EntityId),
    /// The cache was repopulated with this many entities.
    Reset(usize),
}

/// Owned export target for background export.
#[derive(Debug, Clone)]
pub enum ExportDestination {
    Directory(PathBuf),
    Archive(PathBuf),
}

struct Cache<T> {
    items: Vec<T>,
    changes: broadcast::Sender<CacheChange>,
}

impl<T: Persistable> Cache<T> {
    fn position(&self, id: EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn notify(&self, change: CacheChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    fn reset(&mut self, items: Vec<T>) {
        let count = items.len();
        self.items = items;
        self.notify(CacheChange::Reset(count));
    }

    /// Replaces the cached entry with the same identity; no-op if absent.
    fn replace(&mut self, item: T) {
        let id = item.id();
        if let Some(index) = self.position(id) {
            self.items[index] = item;
            self.notify(CacheChange::Replaced(id));
        }
    }

    /// Replaces or appends.
    fn merge(&mut self, item: T) {
        let id = item.id();
        match self.position(id) {
            Some(index) => {
                self.items[index] = item;
                self.notify(CacheChange::Replaced(id));
            }
            None => {
                self.items.push(item);
                self.notify(CacheChange::Added(id));
            }
        }
    }

    fn remove(&mut self, id: EntityId) {
        if let Some(index) = self.position(id) {
            self.items.remove(index);
            self.notify(CacheChange::Removed(id));
        }
    }
}

/// Runs blocking I/O on the tokio blocking pool.
async fn blocking<F, R>(f: F) -> StoreResult<R>
where
    F: FnOnce() -> StoreResult<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
}

/// Cache, search forwarding and lifecycle for one entity type.
pub struct PersistentStore<T: Persistable> {
    adapter: Arc<dyn PersistAdapter<T>>,
    search: Arc<dyn SearchIndex<T>>,
    context: Arc<PresentationContext>,
    cache: Arc<Mutex<Cache<T>>>,
    state: Arc<Mutex<StoreState>>,
    changes: broadcast::Sender<CacheChange>,
}

impl<T: Persistable> PersistentStore<T> {
    pub fn new(
        adapter: Arc<dyn PersistAdapter<T>>,
        search: Arc<dyn SearchIndex<T>>,
        context: Arc<PresentationContext>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            adapter,
            search,
            context,
            cache: Arc::new(Mutex::new(Cache {
                items: Vec::new(),
                changes: changes.clone(),
            })),
            state: Arc::new(Mutex::new(StoreState::Uninitialized)),
            changes,
        }
    }

    pub fn kind(&self) -> DataKind {
        T::KIND
    }

    pub fn state(&self) -> StoreState {
        *self.state.lock()
    }

    pub fn adapter(&self) -> &Arc<dyn PersistAdapter<T>> {
        &self.adapter
    }

    pub fn context(&self) -> &Arc<PresentationContext> {
        &self.context
    }

    /// Receives a [`CacheChange`] for every cache mutation from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheChange> {
        self.changes.subscribe()
    }

    /// Prepares the adapter, loads every entity and fills the cache.
    ///
    /// The store is `Ready` once the cache has been populated on the
    /// presentation context. On failure it returns to `Uninitialized` and
    /// may be initialized again.
    pub async fn initialize(&self) -> StoreResult<()> {
        {
            let mut state = self.state.lock();
            if *state != StoreState::Uninitialized {
                return Err(StoreError::AlreadyInitialized(T::KIND));
            }
            *state = StoreState::Initializing;
        }

        match self.load_into_cache().await {
            Ok(count) => {
                info!(kind = %T::KIND, count, "Store ready");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = StoreState::Uninitialized;
                warn!(kind = %T::KIND, error = %e, "Store initialization failed");
                Err(e)
            }
        }
    }

    async fn load_into_cache(&self) -> StoreResult<usize> {
        let adapter = Arc::clone(&self.adapter);
        let items = blocking(move || {
            adapter.initialize()?;
            Ok(adapter.load()?)
        })
        .await?;

        let cache = Arc::clone(&self.cache);
        let state = Arc::clone(&self.state);
        self.context
            .invoke(move || {
                let count = items.len();
                cache.lock().reset(items);
                *state.lock() = StoreState::Ready;
                count
            })
            .await
    }

    fn ensure_ready(&self) -> StoreResult<()> {
        match self.state() {
            StoreState::Ready => Ok(()),
            state => Err(StoreError::NotReady {
                kind: T::KIND,
                state,
            }),
        }
    }

    fn collaborators(&self) -> (Arc<dyn PersistAdapter<T>>, Arc<dyn SearchIndex<T>>) {
        (Arc::clone(&self.adapter), Arc::clone(&self.search))
    }

    /// Runs `f` against the cache on the presentation context.
    async fn apply<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Cache<T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        self.context
            .invoke(move || {
                let mut cache = cache.lock();
                f(&mut cache)
            })
            .await
    }

    /// Writes a new entity, indexes it and appends it to the cache. An entry
    /// that a concurrent import already cached is replaced instead.
    ///
    /// If the file is written but indexing fails the call fails and the
    /// cache is left alone; `update` with the same entity repairs both.
    pub async fn create(&self, item: &T) -> StoreResult<()> {
        self.ensure_ready()?;
        let (adapter, search) = self.collaborators();
        let item = item.clone();
        let item = blocking(move || {
            adapter.create(&item)?;
            search.create(&item)?;
            Ok(item)
        })
        .await?;

        debug!(kind = %T::KIND, id = %item.id(), "Created entity");
        self.apply(move |cache| cache.merge(item)).await
    }

    /// Overwrites the entity, reindexes it and replaces its cache entry.
    pub async fn update(&self, item: &T) -> StoreResult<()> {
        self.ensure_ready()?;
        let (adapter, search) = self.collaborators();
        let item = item.clone();
        let item = blocking(move || {
            adapter.update(&item)?;
            search.update(&item)?;
            Ok(item)
        })
        .await?;

        debug!(kind = %T::KIND, id = %item.id(), "Updated entity");
        self.apply(move |cache| cache.replace(item)).await
    }

    pub async fn delete(&self, item: &T) -> StoreResult<()> {
        self.ensure_ready()?;
        let (adapter, search) = self.collaborators();
        let item = item.clone();
        let id = item.id();
        blocking(move || {
            adapter.delete(&item)?;
            search.delete(&item)?;
            Ok(())
        })
        .await?;

        debug!(kind = %T::KIND, id = %id, "Deleted entity");
        self.apply(move |cache| cache.remove(id)).await
    }

    /// Imports `path` and merges the created and updated entities into the
    /// cache.
    ///
    /// When nothing could be imported the outcome depends on
    /// `is_type_known`: `false` treats the file as belonging to another
    /// type and returns `Ok(None)`, `true` fails with
    /// [`StoreError::NothingImported`]. A path that is not a regular file
    /// fails either way.
    pub async fn import_data(
        &self,
        path: impl Into<PathBuf>,
        is_type_known: bool,
    ) -> StoreResult<Option<DataImportResult<T>>> {
        self.ensure_ready()?;
        let path = path.into();
        let (adapter, search) = self.collaborators();
        let source = path.clone();
        let result = blocking(move || {
            let mut result = adapter.import_data(&source)?;
            index_imported(search.as_ref(), &mut result);
            Ok(result)
        })
        .await?;

        if result.is_empty() {
            if is_type_known {
                return Err(StoreError::NothingImported {
                    reason: nothing_imported_reason(&result),
                    path,
                });
            }
            debug!(kind = %T::KIND, path = %path.display(), "File not recognized for this type");
            return Ok(None);
        }

        let imported: Vec<T> = result
            .created()
            .iter()
            .chain(result.updated())
            .cloned()
            .collect();
        self.apply(move |cache| {
            for item in imported {
                cache.merge(item);
            }
        })
        .await?;

        info!(
            kind = %T::KIND,
            path = %path.display(),
            created = result.created().len(),
            updated = result.updated().len(),
            "Imported into store"
        );
        Ok(Some(result))
    }

    /// Exports `items` with the provider registered for `format`.
    pub async fn export_data(
        &self,
        format: &str,
        destination: ExportDestination,
        items: Vec<T>,
    ) -> StoreResult<()> {
        self.ensure_ready()?;
        let adapter = Arc::clone(&self.adapter);
        let format = format.to_string();
        blocking(move || {
            let target = match &destination {
                ExportDestination::Directory(dir) => ExportTarget::Directory(dir),
                ExportDestination::Archive(path) => ExportTarget::Archive(path),
            };
            adapter.export_data(&format, target, &items)?;
            Ok(())
        })
        .await
    }

    /// Exports a snapshot of every cached entity.
    pub async fn export_all(&self, format: &str, destination: ExportDestination) -> StoreResult<()> {
        self.ensure_ready()?;
        let items = self.apply(|cache| cache.items.clone()).await?;
        self.export_data(format, destination, items).await
    }

    // ── Presentation-context reads ───────────────────────────────

    fn ensure_cache_access(&self) -> StoreResult<()> {
        self.context.ensure_current()?;
        self.ensure_ready()
    }

    /// Cached entity with identity `id`. Presentation context only.
    pub fn get_item(&self, id: EntityId) -> StoreResult<Option<T>> {
        self.ensure_cache_access()?;
        let cache = self.cache.lock();
        Ok(cache.position(id).map(|index| cache.items[index].clone()))
    }

    /// Snapshot of the cache. Presentation context only.
    pub fn items(&self) -> StoreResult<Vec<T>> {
        self.with_items(<[T]>::to_vec)
    }

    /// Runs `f` over the cached entities without copying them.
    /// Presentation context only.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> StoreResult<R> {
        self.ensure_cache_access()?;
        Ok(f(&self.cache.lock().items))
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.with_items(<[T]>::len)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.with_items(<[T]>::is_empty)
    }
}

impl<T: Persistable> fmt::Debug for PersistentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("kind", &T::KIND)
            .field("state", &self.state())
            .finish()
    }
}

/// Forwards imported entities to the search index. Failures become import
/// warnings; the files are already written.
fn index_imported<T: Persistable>(search: &dyn SearchIndex<T>, result: &mut DataImportResult<T>) {
    let mut failures = Vec::new();
    for item in result.created() {
        if let Err(e) = search.create(item) {
            failures.push(format!("{}: {e}", item.name()));
        }
    }
    for item in result.updated() {
        if let Err(e) = search.update(item) {
            failures.push(format!("{}: {e}", item.name()));
        }
    }
    for failure in failures {
        warn!(kind = %T::KIND, failure = %failure, "Failed to index imported entity");
        result.record_warning(format!("search index: {failure}"));
    }
}

fn nothing_imported_reason<T>(result: &DataImportResult<T>) -> String {
    result
        .errors()
        .first()
        .map(ToString::to_string)
        .or_else(|| result.warnings().first().cloned())
        .unwrap_or_else(|| "no entities found".to_string())
}
