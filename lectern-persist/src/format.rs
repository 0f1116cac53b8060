//! Format provider contracts.
//!
//! A [`DataFormatProvider`] is a codec for one serialization format of one
//! entity type. An [`ImportExportProvider`] additionally knows how to
//! export into files, streams and archive entries, and how to turn a whole
//! file into a batch import through an adapter.

use crate::adapter::PersistAdapter;
use crate::error::PersistResult;
use crate::result::{DataImportResult, DataReadResult};
use lectern_model::Persistable;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A stream that can be read and repositioned.
pub trait ReadSeek: Read + Seek {}

impl<S: Read + Seek> ReadSeek for S {}

pub trait DataFormatProvider<T>: Send + Sync {
    /// Format identifier used to select the provider for export.
    fn id(&self) -> &str;

    /// Extension for exported files; `None` keeps the native extension.
    fn file_extension(&self) -> Option<&str> {
        None
    }

    fn is_supported_path(&self, path: &Path) -> bool;

    fn is_supported_mime(&self, mime: &str) -> bool;

    /// Sniffs `stream`. Implementations must leave the stream positioned
    /// where they found it.
    fn is_supported_stream(&self, name: &str, stream: &mut dyn ReadSeek) -> bool;

    fn read(&self, path: &Path) -> PersistResult<Vec<DataReadResult<T>>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut reader = BufReader::new(File::open(path)?);
        self.read_stream(&name, &mut reader)
    }

    fn read_stream(&self, name: &str, stream: &mut dyn Read) -> PersistResult<Vec<DataReadResult<T>>>;

    /// Writes `item` to `path` without ever exposing a partial file there.
    fn write(&self, path: &Path, item: &T) -> PersistResult<()> {
        write_atomically(path, |out| self.write_stream(out, item))
    }

    fn write_stream(&self, stream: &mut dyn Write, item: &T) -> PersistResult<()>;
}

pub trait ImportExportProvider<T: Persistable>: DataFormatProvider<T> {
    fn export_file(&self, adapter: &dyn PersistAdapter<T>, path: &Path, item: &T) -> PersistResult<()> {
        let _ = adapter;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write(path, item)
    }

    fn export_stream(
        &self,
        adapter: &dyn PersistAdapter<T>,
        stream: &mut dyn Write,
        item: &T,
    ) -> PersistResult<()> {
        let _ = adapter;
        self.write_stream(stream, item)
    }

    fn export_entry(
        &self,
        adapter: &dyn PersistAdapter<T>,
        archive: &mut ZipWriter<File>,
        entry_name: &str,
        item: &T,
    ) -> PersistResult<()> {
        let _ = adapter;
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .large_file(true);
        archive.start_file(entry_name, options)?;
        self.write_stream(archive, item)
    }

    /// Reads every entity in `path` and upserts it through `adapter`.
    fn import(&self, adapter: &dyn PersistAdapter<T>, path: &Path) -> PersistResult<DataImportResult<T>> {
        let mut result = DataImportResult::new();
        for DataReadResult { data, warnings } in self.read(path)? {
            for warning in warnings {
                result.record_warning(format!("{}: {warning}", path.display()));
            }
            match adapter.upsert(&data) {
                Ok(true) => result.record_updated(data),
                Ok(false) => result.record_created(data),
                Err(e) => result.record_error(e),
            }
        }
        Ok(result)
    }
}

/// Runs `write` against a hidden sibling of `path`, then renames it into
/// place. The sibling is removed if anything fails.
pub fn write_atomically<F>(path: &Path, write: F) -> PersistResult<()>
where
    F: FnOnce(&mut dyn Write) -> PersistResult<()>,
{
    let staging = staging_path(path);
    let outcome = stage_and_rename(&staging, path, write);
    if outcome.is_err() {
        let _ = fs::remove_file(&staging);
    }
    outcome
}

/// Hidden sibling that `path` is written to before being renamed into place.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

fn stage_and_rename<F>(staging: &Path, path: &Path, write: F) -> PersistResult<()>
where
    F: FnOnce(&mut dyn Write) -> PersistResult<()>,
{
    let mut out = BufWriter::new(File::create(staging)?);
    write(&mut out)?;
    out.flush()?;
    out.get_ref().sync_all()?;
    drop(out);
    fs::rename(staging, path)?;
    Ok(())
}

/// Reads up to `limit` bytes from the current position and seeks back.
pub fn peek(stream: &mut dyn ReadSeek, limit: usize) -> std::io::Result<Vec<u8>> {
    let start = stream.stream_position()?;
    let mut buf = Vec::with_capacity(limit);
    let read = (&mut *stream).take(limit as u64).read_to_end(&mut buf);
    stream.seek(SeekFrom::Start(start))?;
    read?;
    Ok(buf)
}
