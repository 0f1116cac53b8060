mod common;

use common::{song, song_adapter};
use lectern_model::{Persistable, Song};
use lectern_persist::{
    CHORDPRO_FORMAT_ID, DataFormatProvider, DataReadResult, ExportTarget, FilePersistAdapter,
    ImportExportProvider, JSON_FORMAT_ID, PathResolver, PersistAdapter, PersistError,
    PersistResult, ReadSeek,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use zip::ZipArchive;

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}

// ── Directory ────────────────────────────────────────────────────

#[test]
fn export_to_directory_uses_friendly_names() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let songs = vec![song("Amazing Grace"), song("How Great: Thou Art?")];
    let out = dir.path().join("out");

    adapter
        .export_data(JSON_FORMAT_ID, ExportTarget::Directory(&out), &songs)
        .unwrap();

    let expected: BTreeSet<String> = ["Amazing Grace.json", "How Great_ Thou Art_.json"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(file_names(&out), expected);
}

#[test]
fn duplicate_names_get_identity_suffix() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let first = song("Doxology");
    let second = song("Doxology");
    let out = dir.path().join("out");

    adapter
        .export_data(
            JSON_FORMAT_ID,
            ExportTarget::Directory(&out),
            &[first.clone(), second.clone()],
        )
        .unwrap();

    let names = file_names(&out);
    assert_eq!(names.len(), 2);
    assert!(names.contains("Doxology.json"));
    assert!(names.contains(&format!("Doxology ({}).json", second.id().simple())));
}

#[test]
fn exported_native_files_import_back() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let s = song("Be Thou My Vision");
    let out = dir.path().join("out");
    adapter
        .export_data(JSON_FORMAT_ID, ExportTarget::Directory(&out), &[s.clone()])
        .unwrap();

    let other = song_adapter(&dir.path().join("second"));
    let result = other.import_data(&out.join("Be Thou My Vision.json")).unwrap();
    assert_eq!(result.created(), &[s]);
}

#[test]
fn chordpro_export_uses_its_own_extension() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let out = dir.path().join("out");
    adapter
        .export_data(
            CHORDPRO_FORMAT_ID,
            ExportTarget::Directory(&out),
            &[song("Abide With Me")],
        )
        .unwrap();

    let text = fs::read_to_string(out.join("Abide With Me.cho")).unwrap();
    assert!(text.starts_with("{title: Abide With Me}"));
    assert!(text.contains("{comment: Verse 1}"));
}

// ── Archive ──────────────────────────────────────────────────────

#[test]
fn export_to_archive_writes_one_entry_per_item() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let songs = vec![song("One"), song("Two"), song("Three")];
    let archive = dir.path().join("nested").join("songs.zip");

    adapter
        .export_data(JSON_FORMAT_ID, ExportTarget::Archive(&archive), &songs)
        .unwrap();

    let zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
    let names: BTreeSet<String> = zip.file_names().map(String::from).collect();
    let expected: BTreeSet<String> = ["One.json", "Two.json", "Three.json"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn exported_archive_imports_back() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let songs = vec![song("One"), song("Two")];
    let archive = dir.path().join("songs.zip");
    adapter
        .export_data(JSON_FORMAT_ID, ExportTarget::Archive(&archive), &songs)
        .unwrap();

    let other = song_adapter(&dir.path().join("second"));
    let result = other.import_data(&archive).unwrap();
    assert_eq!(result.created().len(), 2);
    assert!(result.errors().is_empty());
}

// ── Stream ───────────────────────────────────────────────────────

#[test]
fn export_to_stream_concatenates_items() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let mut buf = Vec::new();

    adapter
        .export_data(
            CHORDPRO_FORMAT_ID,
            ExportTarget::Stream(&mut buf),
            &[song("First"), song("Second")],
        )
        .unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("{title: First}"));
    assert!(text.contains("{title: Second}"));
    assert!(text.find("First").unwrap() < text.find("Second").unwrap());
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn unknown_format_is_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let adapter = song_adapter(dir.path());
    let out = dir.path().join("out");

    let err = adapter
        .export_data("opensong", ExportTarget::Directory(&out), &[song("X")])
        .unwrap_err();

    assert!(matches!(err, PersistError::UnknownFormat(f) if f == "opensong"));
    assert!(!out.exists());
}

/// Writes song names, refusing the song called "Broken".
struct PickyProvider;

impl DataFormatProvider<Song> for PickyProvider {
    fn id(&self) -> &str {
        "picky"
    }

    fn is_supported_path(&self, _path: &Path) -> bool {
        false
    }

    fn is_supported_mime(&self, _mime: &str) -> bool {
        false
    }

    fn is_supported_stream(&self, _name: &str, _stream: &mut dyn ReadSeek) -> bool {
        false
    }

    fn read_stream(&self, _name: &str, _stream: &mut dyn Read) -> PersistResult<Vec<DataReadResult<Song>>> {
        Ok(Vec::new())
    }

    fn write_stream(&self, stream: &mut dyn Write, item: &Song) -> PersistResult<()> {
        if item.name() == "Broken" {
            return Err(PersistError::InvalidData("cannot write Broken".into()));
        }
        stream.write_all(item.name().as_bytes())?;
        Ok(())
    }
}

impl ImportExportProvider<Song> for PickyProvider {}

#[test]
fn failed_archive_export_keeps_previous_archive() {
    let dir = TempDir::new().unwrap();
    let resolver = PathResolver::from_paths(dir.path().join("songs"), dir.path().join("export"), "json");
    let adapter = FilePersistAdapter::json(resolver).with_provider(Arc::new(PickyProvider));
    adapter.initialize().unwrap();
    let out = dir.path().join("out");
    let archive = out.join("set.zip");
    adapter
        .export_data("picky", ExportTarget::Archive(&archive), &[song("Good")])
        .unwrap();
    let before = fs::read(&archive).unwrap();

    let err = adapter
        .export_data(
            "picky",
            ExportTarget::Archive(&archive),
            &[song("First"), song("Broken"), song("Last")],
        )
        .unwrap_err();

    assert!(matches!(err, PersistError::InvalidData(_)));
    assert_eq!(fs::read(&archive).unwrap(), before);
    let expected: BTreeSet<String> = ["set.zip".to_string()].into_iter().collect();
    assert_eq!(file_names(&out), expected);
}

#[test]
fn delete_during_export_never_leaves_partial_archive() {
    let dir = TempDir::new().unwrap();
    let adapter = Arc::new(song_adapter(dir.path()));
    let songs: Vec<Song> = (0..40).map(|i| song(&format!("Song {i}"))).collect();
    for s in &songs {
        adapter.create(s).unwrap();
    }
    let archive = dir.path().join("all.zip");
    let barrier = Arc::new(Barrier::new(2));

    let exporter = {
        let adapter = Arc::clone(&adapter);
        let barrier = Arc::clone(&barrier);
        let songs = songs.clone();
        let archive = archive.clone();
        thread::spawn(move || {
            barrier.wait();
            adapter.export_data(JSON_FORMAT_ID, ExportTarget::Archive(&archive), &songs)
        })
    };
    let deleter = {
        let adapter = Arc::clone(&adapter);
        let barrier = Arc::clone(&barrier);
        let songs = songs.clone();
        thread::spawn(move || {
            barrier.wait();
            for s in &songs {
                adapter.delete(s).unwrap();
            }
        })
    };

    exporter.join().unwrap().unwrap();
    deleter.join().unwrap();

    let zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), songs.len());
    assert!(adapter.load().unwrap().is_empty());
}
