//! Mapping from entities to file paths.
//!
//! The canonical path is a pure function of the identity:
//! `{base}/{id-without-dashes}.{ext}`. Friendly paths are derived from the
//! display name and are only ever used for export.

use lectern_model::Persistable;
use lectern_types::EntityId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the scratch directory under the base path used while unpacking
/// archives during import.
pub const TEMP_DIR_NAME: &str = "temp";

const MAX_FRIENDLY_NAME_CHARS: usize = 120;

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Directory and extension settings for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResolverConfig {
    /// Directory holding the canonical files.
    pub base_path: PathBuf,
    /// Directory exports are written under.
    pub export_base_path: PathBuf,
    /// File extension without the leading dot.
    pub extension: String,
}

/// Resolves canonical, relative, export and friendly paths for entities.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config: PathResolverConfig,
}

impl PathResolver {
    pub fn new(config: PathResolverConfig) -> Self {
        let extension = config.extension.trim_start_matches('.').to_string();
        Self {
            config: PathResolverConfig {
                extension,
                ..config
            },
        }
    }

    pub fn from_paths(
        base_path: impl Into<PathBuf>,
        export_base_path: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self::new(PathResolverConfig {
            base_path: base_path.into(),
            export_base_path: export_base_path.into(),
            extension: extension.into(),
        })
    }

    /// Ensures the base directory exists. Idempotent.
    pub fn initialize(&self) -> io::Result<()> {
        fs::create_dir_all(&self.config.base_path)?;
        debug!(path = %self.config.base_path.display(), "Initialized data directory");
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    pub fn export_base_path(&self) -> &Path {
        &self.config.export_base_path
    }

    pub fn extension(&self) -> &str {
        &self.config.extension
    }

    pub fn config(&self) -> &PathResolverConfig {
        &self.config
    }

    /// Scratch area used while importing archives.
    pub fn temp_path(&self) -> PathBuf {
        self.config.base_path.join(TEMP_DIR_NAME)
    }

    /// `{id}.{ext}` relative to the base directory.
    pub fn relative_path_for(&self, id: EntityId) -> PathBuf {
        PathBuf::from(format!("{}.{}", id.simple(), self.config.extension))
    }

    pub fn path_for(&self, id: EntityId) -> PathBuf {
        self.config.base_path.join(self.relative_path_for(id))
    }

    pub fn relative_path<T: Persistable>(&self, item: &T) -> PathBuf {
        self.relative_path_for(item.id())
    }

    /// Canonical path of `item`.
    pub fn path<T: Persistable>(&self, item: &T) -> PathBuf {
        self.path_for(item.id())
    }

    pub fn export_path<T: Persistable>(&self, item: &T) -> PathBuf {
        self.config.export_base_path.join(self.relative_path(item))
    }

    /// Human readable file name built from the display name.
    pub fn friendly_file_name<T: Persistable>(&self, item: &T) -> String {
        self.friendly_file_name_with(item, &self.config.extension)
    }

    /// Like [`friendly_file_name`](Self::friendly_file_name) with another
    /// extension, for exports in a non-native format.
    pub fn friendly_file_name_with<T: Persistable>(&self, item: &T, extension: &str) -> String {
        let stem = sanitize_file_name(item.name()).unwrap_or_else(|| item.id().simple());
        format!("{stem}.{extension}")
    }

    pub fn friendly_export_path<T: Persistable>(&self, item: &T) -> PathBuf {
        self.config
            .export_base_path
            .join(self.friendly_file_name(item))
    }
}

/// Turns a display name into something every common filesystem accepts.
///
/// Path separators, characters Windows rejects, and control characters
/// become `_`; trailing dots and spaces are dropped; reserved device names
/// get a `_` prefix. Returns `None` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_FRIENDLY_NAME_CHARS)
        .collect();

    let trimmed = replaced
        .trim()
        .trim_end_matches(['.', ' '])
        .to_string();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or_default();
    if RESERVED_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(stem))
    {
        return Some(format!("_{trimmed}"));
    }
    Some(trimmed)
}
