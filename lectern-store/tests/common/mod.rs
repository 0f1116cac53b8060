//! Shared helpers for store tests.

#![allow(dead_code)]

use lectern_model::{Bible, Persistable, Song, SongSection};
use lectern_persist::{DataFormatProvider, FilePersistAdapter, JsonFormatProvider, PathResolver};
use lectern_store::{PersistentStore, PresentationContext, SearchError, SearchIndex, SearchResult};
use lectern_types::EntityId;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Search index that records every call and can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingIndex {
    fail: AtomicBool,
    calls: Mutex<Vec<(&'static str, EntityId)>>,
}

impl RecordingIndex {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(&'static str, EntityId)> {
        self.calls.lock().clone()
    }

    fn record(&self, op: &'static str, id: EntityId) -> SearchResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("index offline".into()));
        }
        self.calls.lock().push((op, id));
        Ok(())
    }
}

impl<T: Persistable> SearchIndex<T> for RecordingIndex {
    fn create(&self, item: &T) -> SearchResult<()> {
        self.record("create", item.id())
    }

    fn update(&self, item: &T) -> SearchResult<()> {
        self.record("update", item.id())
    }

    fn delete(&self, item: &T) -> SearchResult<()> {
        self.record("delete", item.id())
    }
}

pub fn context() -> Arc<PresentationContext> {
    Arc::new(PresentationContext::spawn("test-presentation").unwrap())
}

pub fn song_adapter(root: &Path) -> Arc<FilePersistAdapter<Song>> {
    let resolver = PathResolver::from_paths(root.join("song"), root.join("export"), "json");
    Arc::new(FilePersistAdapter::json(resolver))
}

/// Uninitialized song store over `{root}/song`.
pub fn song_store(root: &Path, search: Arc<RecordingIndex>) -> Arc<PersistentStore<Song>> {
    Arc::new(PersistentStore::new(song_adapter(root), search, context()))
}

/// Initialized song store over `{root}/song`.
pub async fn ready_song_store(root: &Path, search: Arc<RecordingIndex>) -> Arc<PersistentStore<Song>> {
    let store = song_store(root, search);
    store.initialize().await.unwrap();
    store
}

pub fn song(name: &str) -> Song {
    Song::new(name).with_section(SongSection::new("Verse 1", vec![format!("{name} lyrics")]))
}

pub fn native_bytes<T: Persistable>(item: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    JsonFormatProvider::<T>::new()
        .write_stream(&mut buf, item)
        .unwrap();
    buf
}

pub fn write_native<T: Persistable>(path: &Path, item: &T) {
    fs::write(path, native_bytes(item)).unwrap();
}

pub fn bible(name: &str) -> Bible {
    Bible::new(name)
}

/// Writes a zip at `path` with the given `(entry name, contents)` pairs.
pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
