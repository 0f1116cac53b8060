//! Native JSON format.
//!
//! Every file is an envelope carrying the entity's format tag and version
//! next to the data:
//!
//! ```json
//! { "format": "lectern/song", "version": "1", "data": { ... } }
//! ```

use crate::error::{PersistError, PersistResult};
use crate::format::{DataFormatProvider, ImportExportProvider, ReadSeek, peek};
use crate::result::DataReadResult;
use lectern_model::Persistable;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::Path;

pub const JSON_FORMAT_ID: &str = "json";

const SNIFF_BYTES: usize = 512;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: &'a str,
    data: &'a T,
}

#[derive(Deserialize)]
struct FormatTag {
    format: String,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: String,
    data: serde_json::Value,
}

/// Reads and writes `T` in the native JSON envelope.
#[derive(Debug)]
pub struct JsonFormatProvider<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Persistable> JsonFormatProvider<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn looks_like_object(head: &[u8]) -> bool {
        String::from_utf8_lossy(head).trim_start().starts_with('{')
    }

    /// Parses just the envelope's format tag; the key may appear anywhere
    /// in the object.
    fn has_own_format(stream: &mut dyn ReadSeek) -> std::io::Result<bool> {
        let start = stream.stream_position()?;
        let tag = serde_json::from_reader::<_, FormatTag>(BufReader::new(&mut *stream));
        stream.seek(SeekFrom::Start(start))?;
        Ok(tag.is_ok_and(|tag| tag.format == T::FORMAT))
    }
}

impl<T: Persistable> Default for JsonFormatProvider<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Persistable> DataFormatProvider<T> for JsonFormatProvider<T> {
    fn id(&self) -> &str {
        JSON_FORMAT_ID
    }

    fn is_supported_path(&self, path: &Path) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.is_supported_stream(&name, &mut BufReader::new(file))
    }

    fn is_supported_mime(&self, mime: &str) -> bool {
        mime.eq_ignore_ascii_case("application/json")
    }

    fn is_supported_stream(&self, _name: &str, stream: &mut dyn ReadSeek) -> bool {
        match peek(stream, SNIFF_BYTES) {
            Ok(head) if Self::looks_like_object(&head) => {
                Self::has_own_format(stream).unwrap_or(false)
            }
            _ => false,
        }
    }

    fn read_stream(&self, name: &str, stream: &mut dyn Read) -> PersistResult<Vec<DataReadResult<T>>> {
        let envelope: Envelope = serde_json::from_reader(stream)?;
        if envelope.format != T::FORMAT {
            return Err(PersistError::InvalidData(format!(
                "{name}: expected format '{}', found '{}'",
                T::FORMAT,
                envelope.format
            )));
        }

        let mut warnings = Vec::new();
        if envelope.version != T::VERSION {
            warnings.push(format!(
                "{name}: read {} version {} with reader for version {}",
                envelope.format,
                envelope.version,
                T::VERSION
            ));
        }

        let data: T = serde_json::from_value(envelope.data)?;
        Ok(vec![DataReadResult::with_warnings(data, warnings)])
    }

    fn write_stream(&self, stream: &mut dyn Write, item: &T) -> PersistResult<()> {
        let envelope = EnvelopeRef {
            format: T::FORMAT,
            version: T::VERSION,
            data: item,
        };
        serde_json::to_writer_pretty(stream, &envelope)?;
        Ok(())
    }
}

impl<T: Persistable> ImportExportProvider<T> for JsonFormatProvider<T> {}
