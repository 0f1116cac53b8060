//! File-system backed CRUD engine for one entity type.
//!
//! # Locking
//!
//! Every entity identity has its own lock (see [`LockMap`]). `create`,
//! `update` and `upsert` take only that lock, so unrelated entities never
//! wait on each other. A second, adapter-wide export lock guards bulk
//! export; `delete` and `export_data` take it *before* any entity lock.
//! The export lock is never acquired while an entity lock is held.
//!
//! Writes replace the canonical file through a hidden staging file and a
//! rename, so readers never observe a partially written entity.

use crate::archive::{self, ScratchDir};
use crate::error::{PersistError, PersistResult};
use crate::format::{DataFormatProvider, ImportExportProvider, staging_path};
use crate::lock::LockMap;
use crate::path::PathResolver;
use crate::result::DataImportResult;
use lectern_model::Persistable;
use lectern_types::EntityId;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipWriter;

/// Archives nested deeper than this inside an imported file are skipped.
pub const MAX_ARCHIVE_DEPTH: usize = 8;

/// Where `export_data` writes to.
pub enum ExportTarget<'a> {
    /// One file per item, named after the item's display name.
    Directory(&'a Path),
    /// A zip archive created at the path, one entry per item.
    Archive(&'a Path),
    /// Items written back to back.
    Stream(&'a mut dyn Write),
}

/// CRUD, import and export for one entity type.
pub trait PersistAdapter<T: Persistable>: Send + Sync {
    /// Prepares the storage location.
    fn initialize(&self) -> PersistResult<()>;

    /// Reads every stored entity. Files that fail to parse are logged and
    /// skipped. Order is unspecified.
    fn load(&self) -> PersistResult<Vec<T>>;

    /// Stores a new entity; fails with [`PersistError::AlreadyExists`]
    /// when its canonical file is already present.
    fn create(&self, item: &T) -> PersistResult<()>;

    /// Overwrites the entity's file unconditionally.
    fn update(&self, item: &T) -> PersistResult<()>;

    /// Removes the entity's file. A missing file is not an error.
    fn delete(&self, item: &T) -> PersistResult<()>;

    /// Creates or updates; returns whether the entity already existed.
    fn upsert(&self, item: &T) -> PersistResult<bool>;

    fn export_data(&self, format: &str, target: ExportTarget<'_>, items: &[T]) -> PersistResult<()>;

    /// Imports a file, falling back to archive extraction when no provider
    /// understands it directly.
    fn import_data(&self, path: &Path) -> PersistResult<DataImportResult<T>>;

    /// Canonical file of `item`.
    fn file_path(&self, item: &T) -> PathBuf;

    /// The lock serializing all mutations of `id`.
    fn lock(&self, id: EntityId) -> Arc<Mutex<()>>;

    fn path_resolver(&self) -> &PathResolver;

    /// Identifiers of the registered import/export formats, in order.
    fn formats(&self) -> Vec<String>;
}

/// [`PersistAdapter`] storing one file per entity under a [`PathResolver`]
/// base directory.
pub struct FilePersistAdapter<T: Persistable> {
    resolver: PathResolver,
    /// Native format used by `load` and the CRUD writes.
    primary: Arc<dyn DataFormatProvider<T>>,
    /// Import/export chain, tried in registration order.
    providers: Vec<Arc<dyn ImportExportProvider<T>>>,
    locks: LockMap<EntityId>,
    export_lock: Mutex<()>,
}

impl<T: Persistable> FilePersistAdapter<T> {
    pub fn new(resolver: PathResolver, primary: Arc<dyn DataFormatProvider<T>>) -> Self {
        Self {
            resolver,
            primary,
            providers: Vec::new(),
            locks: LockMap::new(),
            export_lock: Mutex::new(()),
        }
    }

    /// Native JSON storage with JSON registered as the first import/export
    /// format.
    pub fn json(resolver: PathResolver) -> Self {
        let json = Arc::new(crate::json::JsonFormatProvider::<T>::new());
        Self::new(resolver, json.clone()).with_provider(json)
    }

    /// Appends a provider to the import/export chain.
    pub fn with_provider(mut self, provider: Arc<dyn ImportExportProvider<T>>) -> Self {
        self.providers.push(provider);
        self
    }

    fn provider(&self, format: &str) -> PersistResult<&Arc<dyn ImportExportProvider<T>>> {
        self.providers
            .iter()
            .find(|p| p.id() == format)
            .ok_or_else(|| PersistError::UnknownFormat(format.to_string()))
    }

    fn create_locked(&self, item: &T, path: &Path) -> PersistResult<()> {
        if path.exists() {
            return Err(PersistError::AlreadyExists {
                id: item.id(),
                path: path.to_path_buf(),
            });
        }
        self.primary.write(path, item)
    }

    fn read_file(&self, path: &Path) -> PersistResult<Vec<T>> {
        let mut items = Vec::new();
        for read in self.primary.read(path)? {
            for warning in &read.warnings {
                debug!(path = %path.display(), warning = %warning, "Read warning");
            }
            items.push(read.data);
        }
        Ok(items)
    }

    /// Steps 2 and 3 of the import: provider chain, then archive fallback.
    /// `depth` counts the archives enclosing `path`.
    fn import_file(&self, path: &Path, depth: usize) -> DataImportResult<T> {
        let mut result = DataImportResult::new();

        for provider in self.providers.iter().filter(|p| p.is_supported_path(path)) {
            match provider.import(self, path) {
                Ok(imported) => {
                    let found = !imported.is_empty();
                    result.add(imported);
                    if found {
                        debug!(path = %path.display(), provider = provider.id(), "Imported file");
                        return result;
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), provider = provider.id(), error = %e, "Provider failed to import file");
                    result.record_error(PersistError::Provider {
                        provider: provider.id().to_string(),
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if archive::is_zip(path) && depth >= MAX_ARCHIVE_DEPTH {
            warn!(path = %path.display(), depth, "Archive nested too deeply, skipping");
            result.record_warning(format!(
                "{}: archive nested deeper than {MAX_ARCHIVE_DEPTH} levels was not imported",
                path.display()
            ));
        } else if archive::is_zip(path) {
            match self.import_archive(path, depth + 1) {
                Ok(imported) => result.add(imported),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to import archive");
                    result.record_error(e);
                }
            }
        } else {
            result.record_warning(format!("{}: no provider could import this file", path.display()));
        }
        result
    }

    fn import_archive(&self, path: &Path, depth: usize) -> PersistResult<DataImportResult<T>> {
        let scratch = ScratchDir::create(&self.resolver.temp_path())?;
        let mut result = DataImportResult::new();

        for skipped in archive::extract_zip(path, scratch.path())? {
            result.record_warning(skipped);
        }

        for entry in WalkDir::new(scratch.path()).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    result.add(self.import_file(entry.path(), depth));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to walk extracted archive");
                    result.record_warning(format!("{}: {e}", path.display()));
                }
            }
        }

        info!(
            path = %path.display(),
            created = result.created().len(),
            updated = result.updated().len(),
            "Imported archive contents"
        );
        Ok(result)
    }

    fn write_archive(
        &self,
        staging: &Path,
        provider: &dyn ImportExportProvider<T>,
        ext: &str,
        items: &[T],
    ) -> PersistResult<()> {
        let mut used = HashSet::new();
        let mut zip = ZipWriter::new(File::create(staging)?);
        for item in items {
            let lock = self.locks.get(&item.id());
            let _guard = lock.lock();
            let friendly = self.resolver.friendly_file_name_with(item, ext);
            let name = Self::unique_name(&mut used, friendly, item, ext);
            provider.export_entry(self, &mut zip, &name, item)?;
        }
        zip.finish()?.sync_all()?;
        Ok(())
    }

    fn unique_name(used: &mut HashSet<String>, friendly: String, item: &T, ext: &str) -> String {
        if used.insert(friendly.clone()) {
            return friendly;
        }
        let stem = friendly.strip_suffix(&format!(".{ext}")).unwrap_or(&friendly);
        let name = format!("{stem} ({}).{ext}", item.id().simple());
        used.insert(name.clone());
        name
    }
}

impl<T: Persistable> PersistAdapter<T> for FilePersistAdapter<T> {
    fn initialize(&self) -> PersistResult<()> {
        self.resolver.initialize()?;
        Ok(())
    }

    fn load(&self) -> PersistResult<Vec<T>> {
        let base = self.resolver.base_path();
        let mut items = Vec::new();

        for entry in fs::read_dir(base)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %base.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !is_file || hidden {
                continue;
            }

            match self.read_file(&path) {
                Ok(mut read) => items.append(&mut read),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
        }

        info!(path = %base.display(), count = items.len(), "Loaded entities");
        Ok(items)
    }

    fn create(&self, item: &T) -> PersistResult<()> {
        let lock = self.locks.get(&item.id());
        let _guard = lock.lock();
        self.create_locked(item, &self.resolver.path(item))
    }

    fn update(&self, item: &T) -> PersistResult<()> {
        let lock = self.locks.get(&item.id());
        let _guard = lock.lock();
        self.primary.write(&self.resolver.path(item), item)
    }

    fn delete(&self, item: &T) -> PersistResult<()> {
        let _export = self.export_lock.lock();
        let lock = self.locks.get(&item.id());
        let _guard = lock.lock();

        let path = self.resolver.path(item);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert(&self, item: &T) -> PersistResult<bool> {
        let lock = self.locks.get(&item.id());
        let _guard = lock.lock();

        let path = self.resolver.path(item);
        if path.exists() {
            self.primary.write(&path, item)?;
            Ok(true)
        } else {
            self.create_locked(item, &path)?;
            Ok(false)
        }
    }

    fn export_data(&self, format: &str, target: ExportTarget<'_>, items: &[T]) -> PersistResult<()> {
        let provider = self.provider(format)?;
        let _export = self.export_lock.lock();
        let ext = provider
            .file_extension()
            .unwrap_or(self.resolver.extension())
            .to_string();
        let mut used = HashSet::new();

        match target {
            ExportTarget::Directory(dir) => {
                fs::create_dir_all(dir)?;
                for item in items {
                    let lock = self.locks.get(&item.id());
                    let _guard = lock.lock();
                    let friendly = self.resolver.friendly_file_name_with(item, &ext);
                    let name = Self::unique_name(&mut used, friendly, item, &ext);
                    provider.export_file(self, &dir.join(name), item)?;
                }
            }
            ExportTarget::Archive(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let staging = staging_path(path);
                let written = self
                    .write_archive(&staging, &**provider, &ext, items)
                    .and_then(|()| fs::rename(&staging, path).map_err(PersistError::from));
                if let Err(e) = written {
                    let _ = fs::remove_file(&staging);
                    return Err(e);
                }
            }
            ExportTarget::Stream(stream) => {
                for item in items {
                    let lock = self.locks.get(&item.id());
                    let _guard = lock.lock();
                    provider.export_stream(self, &mut *stream, item)?;
                }
                stream.flush()?;
            }
        }

        info!(format, count = items.len(), "Exported entities");
        Ok(())
    }

    fn import_data(&self, path: &Path) -> PersistResult<DataImportResult<T>> {
        if !path.is_file() {
            return Err(PersistError::NotARegularFile(path.to_path_buf()));
        }
        let result = self.import_file(path, 0);
        info!(
            path = %path.display(),
            created = result.created().len(),
            updated = result.updated().len(),
            warnings = result.warnings().len(),
            errors = result.errors().len(),
            "Import finished"
        );
        Ok(result)
    }

    fn file_path(&self, item: &T) -> PathBuf {
        self.resolver.path(item)
    }

    fn lock(&self, id: EntityId) -> Arc<Mutex<()>> {
        self.locks.get(&id)
    }

    fn path_resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn formats(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }
}
