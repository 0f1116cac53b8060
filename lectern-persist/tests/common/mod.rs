//! Shared test helpers for persistence tests.

#![allow(dead_code)]

use lectern_model::{Song, SongSection};
use lectern_persist::{
    ChordProProvider, DataFormatProvider, FilePersistAdapter, JsonFormatProvider, PathResolver,
    PersistAdapter,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Song adapter rooted at `{root}/songs`, JSON native plus ChordPro import.
pub fn song_adapter(root: &Path) -> FilePersistAdapter<Song> {
    let resolver = PathResolver::from_paths(root.join("songs"), root.join("export"), "json");
    let adapter =
        FilePersistAdapter::json(resolver).with_provider(Arc::new(ChordProProvider::new()));
    adapter.initialize().unwrap();
    adapter
}

pub fn song(name: &str) -> Song {
    Song::new(name).with_tag("Hymn").with_section(SongSection::new(
        "Verse 1",
        vec![format!("{name} line one"), format!("{name} line two")],
    ))
}

/// Native JSON bytes for `song`.
pub fn native_bytes(song: &Song) -> Vec<u8> {
    let mut buf = Vec::new();
    JsonFormatProvider::<Song>::new()
        .write_stream(&mut buf, song)
        .unwrap();
    buf
}

/// Writes a zip at `path` with the given `(entry name, contents)` pairs.
pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Number of entries (recursively) below `dir`; zero when it is missing.
pub fn count_entries(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    walkdir::WalkDir::new(dir).min_depth(1).into_iter().count()
}

/// Regular, non-hidden files directly inside `dir`.
pub fn data_files(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            !p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with('.')
        })
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
