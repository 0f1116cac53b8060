//! Registry of entity stores.
//!
//! One [`PersistentStore`] per entity type, registered once at startup and
//! looked up by type afterwards. A type that was never registered is a
//! wiring bug and fails with [`StoreError::AdapterNotFound`].

use crate::config::DataManagerConfig;
use crate::context::PresentationContext;
use crate::error::{StoreError, StoreResult};
use crate::report::ImportReport;
use crate::search::SearchIndex;
use crate::store::{ExportDestination, PersistentStore};
use async_trait::async_trait;
use lectern_model::{DataKind, Persistable};
use lectern_persist::{FilePersistAdapter, ImportExportProvider, PersistAdapter};
use lectern_types::EntityId;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Type-erased store operations used by multi-type import.
#[async_trait]
trait ErasedStore: Send + Sync {
    async fn try_import(&self, path: PathBuf, is_type_known: bool) -> StoreResult<Option<ImportReport>>;
}

#[async_trait]
impl<T: Persistable> ErasedStore for PersistentStore<T> {
    async fn try_import(&self, path: PathBuf, is_type_known: bool) -> StoreResult<Option<ImportReport>> {
        let result = self.import_data(path, is_type_known).await?;
        Ok(result.as_ref().map(ImportReport::from_result))
    }
}

struct Registration {
    /// `Arc<PersistentStore<T>>` for typed lookups.
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedStore>,
}

pub struct DataManager {
    config: DataManagerConfig,
    context: Arc<PresentationContext>,
    stores: RwLock<HashMap<DataKind, Registration>>,
}

impl DataManager {
    /// Creates a manager with its own presentation context.
    pub fn new(config: DataManagerConfig) -> StoreResult<Self> {
        let context = Arc::new(PresentationContext::spawn(config.context_name.clone())?);
        Ok(Self::with_context(config, context))
    }

    /// Creates a manager sharing an existing presentation context.
    pub fn with_context(config: DataManagerConfig, context: Arc<PresentationContext>) -> Self {
        Self {
            config,
            context,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DataManagerConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<PresentationContext> {
        &self.context
    }

    fn is_registered(&self, kind: DataKind) -> bool {
        self.stores.read().contains_key(&kind)
    }

    /// Wraps `adapter` in a store, initializes it and makes it available.
    ///
    /// The store is only visible to lookups once initialization finished.
    pub async fn register_persist_adapter<T: Persistable>(
        &self,
        adapter: Arc<dyn PersistAdapter<T>>,
        search: Arc<dyn SearchIndex<T>>,
    ) -> StoreResult<Arc<PersistentStore<T>>> {
        if self.is_registered(T::KIND) {
            return Err(StoreError::AlreadyRegistered(T::KIND));
        }

        let store = Arc::new(PersistentStore::new(adapter, search, Arc::clone(&self.context)));
        store.initialize().await?;

        let mut stores = self.stores.write();
        if stores.contains_key(&T::KIND) {
            return Err(StoreError::AlreadyRegistered(T::KIND));
        }
        stores.insert(
            T::KIND,
            Registration {
                typed: Arc::clone(&store) as Arc<dyn Any + Send + Sync>,
                erased: Arc::clone(&store) as Arc<dyn ErasedStore>,
            },
        );
        info!(kind = %T::KIND, "Registered persist adapter");
        Ok(store)
    }

    /// Registers a native JSON file adapter laid out by the manager's
    /// config, with `providers` appended to its import/export chain.
    pub async fn register_file_adapter<T: Persistable>(
        &self,
        providers: Vec<Arc<dyn ImportExportProvider<T>>>,
        search: Arc<dyn SearchIndex<T>>,
    ) -> StoreResult<Arc<PersistentStore<T>>> {
        let mut adapter = FilePersistAdapter::json(self.config.resolver_for(T::KIND));
        for provider in providers {
            adapter = adapter.with_provider(provider);
        }
        self.register_persist_adapter(Arc::new(adapter), search).await
    }

    /// The store for `T`.
    pub fn store<T: Persistable>(&self) -> StoreResult<Arc<PersistentStore<T>>> {
        let stores = self.stores.read();
        let registration = stores
            .get(&T::KIND)
            .ok_or(StoreError::AdapterNotFound(T::KIND))?;
        Arc::clone(&registration.typed)
            .downcast::<PersistentStore<T>>()
            .map_err(|_| StoreError::AdapterNotFound(T::KIND))
    }

    /// Registered entity types, sorted.
    pub fn registered_kinds(&self) -> Vec<DataKind> {
        let mut kinds: Vec<DataKind> = self.stores.read().keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub async fn create<T: Persistable>(&self, item: &T) -> StoreResult<()> {
        self.store::<T>()?.create(item).await
    }

    pub async fn update<T: Persistable>(&self, item: &T) -> StoreResult<()> {
        self.store::<T>()?.update(item).await
    }

    pub async fn delete<T: Persistable>(&self, item: &T) -> StoreResult<()> {
        self.store::<T>()?.delete(item).await
    }

    /// Presentation context only.
    pub fn get_item<T: Persistable>(&self, id: EntityId) -> StoreResult<Option<T>> {
        self.store::<T>()?.get_item(id)
    }

    /// Presentation context only.
    pub fn items<T: Persistable>(&self) -> StoreResult<Vec<T>> {
        self.store::<T>()?.items()
    }

    pub async fn export_data<T: Persistable>(
        &self,
        format: &str,
        destination: ExportDestination,
        items: Vec<T>,
    ) -> StoreResult<()> {
        self.store::<T>()?.export_data(format, destination, items).await
    }

    /// Offers `path` to the store of every type in `kinds` concurrently and
    /// waits for all of them.
    ///
    /// Each store imports with `is_type_known = false`, so a type that does
    /// not understand the file contributes nothing instead of failing.
    /// Returns one report per type that imported something, in `kinds`
    /// order. If any attempt failed outright, the first such error (in
    /// `kinds` order) is returned after every attempt finished.
    pub async fn import_data(&self, path: &Path, kinds: &[DataKind]) -> StoreResult<Vec<ImportReport>> {
        let targets: Vec<(DataKind, Arc<dyn ErasedStore>)> = {
            let stores = self.stores.read();
            kinds
                .iter()
                .map(|kind| {
                    stores
                        .get(kind)
                        .map(|registration| (*kind, Arc::clone(&registration.erased)))
                        .ok_or(StoreError::AdapterNotFound(*kind))
                })
                .collect::<StoreResult<_>>()?
        };

        let attempts: Vec<_> = targets
            .into_iter()
            .map(|(kind, store)| {
                let path = path.to_path_buf();
                (kind, tokio::spawn(async move { store.try_import(path, false).await }))
            })
            .collect();

        let mut reports = Vec::new();
        let mut first_error = None;
        for (kind, attempt) in attempts {
            let outcome = attempt
                .await
                .map_err(|e| StoreError::TaskFailed(e.to_string()))
                .and_then(|outcome| outcome);
            match outcome {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => {
                    warn!(kind = %kind, path = %path.display(), error = %e, "Import attempt failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(path = %path.display(), types = reports.len(), "Multi-type import finished");
                Ok(reports)
            }
        }
    }
}
