//! Zip extraction and scratch-directory handling for archive imports.

use crate::error::PersistResult;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

const LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";
const EMPTY_ARCHIVE: &[u8; 4] = b"PK\x05\x06";

/// True when the file starts with a zip signature.
pub fn is_zip(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => &magic == LOCAL_HEADER || &magic == EMPTY_ARCHIVE,
        Err(_) => false,
    }
}

/// Extracts every file entry of `archive` below `dest`.
///
/// Directory entries are skipped. Entries that cannot be read, or whose
/// names would escape `dest`, are skipped as well; a description of each
/// skipped entry is returned so the caller can report it.
pub fn extract_zip(archive: &Path, dest: &Path) -> PersistResult<Vec<String>> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
    let mut skipped = Vec::new();

    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(archive = %archive.display(), index, error = %e, "Skipping unreadable archive entry");
                skipped.push(format!("{}: entry #{index} unreadable: {e}", archive.display()));
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(archive = %archive.display(), entry = entry.name(), "Skipping archive entry with unsafe path");
            skipped.push(format!("{}: unsafe entry name '{}'", archive.display(), entry.name()));
            continue;
        };

        let target = dest.join(&relative);
        if let Err(e) = copy_entry(&mut entry, &target) {
            warn!(archive = %archive.display(), entry = %relative.display(), error = %e, "Failed to extract archive entry");
            skipped.push(format!(
                "{}: failed to extract '{}': {e}",
                archive.display(),
                relative.display()
            ));
        }
    }

    Ok(skipped)
}

fn copy_entry(entry: &mut impl Read, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    io::copy(entry, &mut out)?;
    Ok(())
}

/// Deletes `dir` and everything below it, deepest paths first.
///
/// The tree holds no symlinks, so reverse lexical order visits children
/// before their parents. A path that cannot be removed is logged and the
/// rest of the tree is still processed.
pub fn remove_tree(dir: &Path) {
    let mut paths: Vec<(PathBuf, bool)> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let is_dir = entry.file_type().is_dir();
                Some((entry.into_path(), is_dir))
            }
            Err(e) => {
                warn!(error = %e, "Failed to walk scratch directory");
                None
            }
        })
        .collect();
    paths.sort_by(|a, b| b.0.cmp(&a.0));

    for (path, is_dir) in paths {
        let removed = if is_dir {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "Failed to delete temporary file");
        }
    }
}

/// A uniquely named directory that is removed with [`remove_tree`] when
/// dropped, including on early returns and unwinding.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates `{parent}/{random}`; `parent` is created if missing.
    pub fn create(parent: &Path) -> io::Result<Self> {
        let path = parent.join(uuid::Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        remove_tree(&self.path);
        debug!(path = %self.path.display(), "Removed scratch directory");
    }
}
