use crate::persistable::{DataKind, Persistable};
use chrono::{DateTime, Utc};
use lectern_types::{EntityId, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A bible translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bible {
    pub id: EntityId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    #[serde(default)]
    pub language: Option<String>,
    /// Short name such as "KJV".
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub number: u16,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u16,
    #[serde(default)]
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u16,
    pub text: String,
}

impl Bible {
    /// Creates an empty translation with a fresh identity.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            created_at: now,
            modified_at: now,
            tags: BTreeSet::new(),
            language: None,
            abbreviation: None,
            copyright: None,
            books: Vec::new(),
        }
    }

    /// Total number of verses across all books.
    pub fn verse_count(&self) -> usize {
        self.books
            .iter()
            .flat_map(|b| &b.chapters)
            .map(|c| c.verses.len())
            .sum()
    }

    /// Looks up a verse by book, chapter and verse number.
    pub fn verse(&self, book: u16, chapter: u16, verse: u16) -> Option<&Verse> {
        self.books
            .iter()
            .find(|b| b.number == book)?
            .chapters
            .iter()
            .find(|c| c.number == chapter)?
            .verses
            .iter()
            .find(|v| v.number == verse)
    }
}

impl Persistable for Bible {
    const KIND: DataKind = DataKind::new("bible");
    const FORMAT: &'static str = "lectern/bible";
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
