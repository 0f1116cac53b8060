use crate::persistable::{DataKind, Persistable};
use chrono::{DateTime, Utc};
use lectern_types::{EntityId, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A song with its lyrics split into labelled sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: EntityId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    #[serde(default)]
    pub copyright: Option<String>,
    /// CCLI song number.
    #[serde(default)]
    pub ccli: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub sections: Vec<SongSection>,
}

/// One verse, chorus, bridge, ... of a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSection {
    /// Display label such as "Verse 1" or "Chorus".
    pub label: String,
    pub lines: Vec<String>,
}

impl SongSection {
    pub fn new(label: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            label: label.into(),
            lines,
        }
    }

    /// The lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Song {
    /// Creates an empty song with a fresh identity.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            created_at: now,
            modified_at: now,
            tags: BTreeSet::new(),
            copyright: None,
            ccli: None,
            authors: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: SongSection) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

impl Persistable for Song {
    const KIND: DataKind = DataKind::new("song");
    const FORMAT: &'static str = "lectern/song";
    const VERSION: &'static str = "1";

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    fn set_modified_at(&mut self, at: DateTime<Utc>) {
        self.modified_at = at;
    }

    fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut BTreeSet<Tag> {
        &mut self.tags
    }
}
