//! File-backed persistence layer for lectern.
//!
//! Stores each entity as one file named after its identity, and imports
//! and exports entities through a chain of format providers.
//!
//! # Architecture
//!
//! - [`PathResolver`] maps entities to canonical, export and friendly paths
//! - [`DataFormatProvider`] / [`ImportExportProvider`] are per-format codecs
//!   ([`JsonFormatProvider`] is the native format, [`ChordProProvider`]
//!   imports songs)
//! - [`FilePersistAdapter`] is the CRUD engine, serializing work per entity
//!   through a [`LockMap`] and guarding bulk export with an adapter-wide lock
//! - [`DataImportResult`] accumulates created/updated entities, warnings and
//!   errors across recursive archive imports
//!
//! # Import
//!
//! `import_data` offers the file to each provider that claims it; the first
//! provider producing at least one entity wins. If none does and the file
//! is a zip archive, the archive is extracted under the type's `temp/`
//! directory, every extracted file is imported recursively, and the scratch
//! directory is removed afterwards whatever happened. Archives nested more
//! than [`MAX_ARCHIVE_DEPTH`] levels deep are skipped with a warning.

mod adapter;
pub mod archive;
mod chordpro;
mod error;
mod format;
mod json;
mod lock;
mod path;
mod result;

pub use adapter::{ExportTarget, FilePersistAdapter, MAX_ARCHIVE_DEPTH, PersistAdapter};
pub use chordpro::{CHORDPRO_FORMAT_ID, ChordProProvider, strip_chords};
pub use error::{PersistError, PersistErrorKind, PersistResult};
pub use format::{DataFormatProvider, ImportExportProvider, ReadSeek, peek, write_atomically};
pub use json::{JSON_FORMAT_ID, JsonFormatProvider};
pub use lock::LockMap;
pub use path::{PathResolver, PathResolverConfig, TEMP_DIR_NAME, sanitize_file_name};
pub use result::{DataImportResult, DataReadResult};
