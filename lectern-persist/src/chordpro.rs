//! ChordPro song import and export.
//!
//! Supports the directives that carry song metadata and structure; chord
//! annotations (`[G]`, `[Am7]`) are stripped from lyric lines. Unknown
//! directives are skipped with a warning.

use crate::error::{PersistError, PersistResult};
use crate::format::{DataFormatProvider, ImportExportProvider, ReadSeek, peek};
use crate::result::DataReadResult;
use lectern_model::{Song, SongSection};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

pub const CHORDPRO_FORMAT_ID: &str = "chordpro";

const EXTENSIONS: &[&str] = &["cho", "chordpro", "chopro", "crd", "pro"];

const SNIFF_BYTES: usize = 256;

/// Imports songs from ChordPro text files.
#[derive(Debug, Default)]
pub struct ChordProProvider;

impl ChordProProvider {
    pub fn new() -> Self {
        Self
    }

    fn has_known_extension(name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }
}

/// Parser state for one file.
struct SongBuilder {
    song: Song,
    title_seen: bool,
    current: Option<SongSection>,
    /// Inside an explicit `{start_of_*}` block; blank lines do not split.
    in_block: bool,
    verse_count: usize,
    warnings: Vec<String>,
}

impl SongBuilder {
    fn new(fallback_title: &str) -> Self {
        Self {
            song: Song::new(fallback_title),
            title_seen: false,
            current: None,
            in_block: false,
            verse_count: 0,
            warnings: Vec::new(),
        }
    }

    fn close_section(&mut self) {
        if let Some(section) = self.current.take()
            && !section.lines.is_empty()
        {
            self.song.sections.push(section);
        }
    }

    fn open_section(&mut self, label: String) {
        self.close_section();
        self.current = Some(SongSection::new(label, Vec::new()));
    }

    fn next_verse_label(&mut self) -> String {
        self.verse_count += 1;
        format!("Verse {}", self.verse_count)
    }

    fn directive(&mut self, line_no: usize, key: &str, value: &str) {
        match key {
            "title" | "t" => {
                self.song.name = value.to_string();
                self.title_seen = true;
            }
            "artist" | "composer" | "lyricist" => {
                if !value.is_empty() {
                    self.song.authors.push(value.to_string());
                }
            }
            "copyright" => self.song.copyright = Some(value.to_string()),
            "ccli" => self.song.ccli = Some(value.to_string()),
            "subtitle" | "st" | "key" | "tempo" | "time" | "capo" => {}
            "start_of_verse" | "sov" => {
                let label = if value.is_empty() {
                    self.next_verse_label()
                } else {
                    value.to_string()
                };
                self.open_section(label);
                self.in_block = true;
            }
            "start_of_chorus" | "soc" => {
                self.open_section(non_empty_or(value, "Chorus"));
                self.in_block = true;
            }
            "start_of_bridge" | "sob" => {
                self.open_section(non_empty_or(value, "Bridge"));
                self.in_block = true;
            }
            "end_of_verse" | "eov" | "end_of_chorus" | "eoc" | "end_of_bridge" | "eob" => {
                self.close_section();
                self.in_block = false;
            }
            "comment" | "c" | "comment_italic" | "ci" => {
                if !value.is_empty() {
                    self.open_section(value.to_string());
                }
            }
            other => self
                .warnings
                .push(format!("line {line_no}: unsupported directive '{other}'")),
        }
    }

    fn lyric(&mut self, line: &str) {
        let text = strip_chords(line);
        if text.is_empty() {
            return;
        }
        if self.current.is_none() {
            let label = self.next_verse_label();
            self.current = Some(SongSection::new(label, Vec::new()));
        }
        if let Some(section) = self.current.as_mut() {
            section.lines.push(text);
        }
    }

    fn blank(&mut self) {
        if !self.in_block {
            self.close_section();
        }
    }

    fn finish(mut self, name: &str) -> PersistResult<DataReadResult<Song>> {
        self.close_section();
        if !self.title_seen && self.song.sections.is_empty() {
            return Err(PersistError::InvalidData(format!(
                "{name}: no ChordPro title or lyrics found"
            )));
        }
        if !self.title_seen {
            self.warnings
                .push(format!("{name}: no title directive, using file name"));
        }
        Ok(DataReadResult::with_warnings(self.song, self.warnings))
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Removes `[chord]` annotations and collapses the leftover spacing.
pub fn strip_chords(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits `{key: value}` into a lowercase key and trimmed value.
fn parse_directive(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('{')?.strip_suffix('}')?;
    let (key, value) = match inner.split_once(':') {
        Some((k, v)) => (k, v),
        None => (inner, ""),
    };
    Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
}

impl DataFormatProvider<Song> for ChordProProvider {
    fn id(&self) -> &str {
        CHORDPRO_FORMAT_ID
    }

    fn file_extension(&self) -> Option<&str> {
        Some(EXTENSIONS[0])
    }

    fn is_supported_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(Self::has_known_extension)
    }

    fn is_supported_mime(&self, mime: &str) -> bool {
        mime.eq_ignore_ascii_case("application/x-chordpro")
            || mime.eq_ignore_ascii_case("text/x-chordpro")
    }

    fn is_supported_stream(&self, name: &str, stream: &mut dyn ReadSeek) -> bool {
        if Self::has_known_extension(name) {
            return true;
        }
        let Ok(head) = peek(stream, SNIFF_BYTES) else {
            return false;
        };
        String::from_utf8_lossy(&head)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .and_then(parse_directive)
            .is_some_and(|(key, _)| key == "title" || key == "t")
    }

    fn read_stream(&self, name: &str, stream: &mut dyn Read) -> PersistResult<Vec<DataReadResult<Song>>> {
        let fallback = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let mut builder = SongBuilder::new(&fallback);

        for (idx, line) in BufReader::new(stream).lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.is_empty() {
                builder.blank();
                continue;
            }
            match parse_directive(trimmed) {
                Some((key, value)) => builder.directive(idx + 1, &key, &value),
                None => builder.lyric(trimmed),
            }
        }

        Ok(vec![builder.finish(name)?])
    }

    fn write_stream(&self, stream: &mut dyn Write, item: &Song) -> PersistResult<()> {
        writeln!(stream, "{{title: {}}}", item.name)?;
        for author in &item.authors {
            writeln!(stream, "{{artist: {author}}}")?;
        }
        if let Some(copyright) = &item.copyright {
            writeln!(stream, "{{copyright: {copyright}}}")?;
        }
        if let Some(ccli) = &item.ccli {
            writeln!(stream, "{{ccli: {ccli}}}")?;
        }
        for section in &item.sections {
            writeln!(stream)?;
            writeln!(stream, "{{comment: {}}}", section.label)?;
            for line in &section.lines {
                writeln!(stream, "{line}")?;
            }
        }
        Ok(())
    }
}

impl ImportExportProvider<Song> for ChordProProvider {}
