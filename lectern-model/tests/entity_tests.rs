use chrono::{Duration, Utc};
use lectern_model::{Bible, Book, Chapter, DataKind, Persistable, Song, SongSection, Verse};
use lectern_types::Tag;
use pretty_assertions::assert_eq;

fn amazing_grace() -> Song {
    Song::new("Amazing Grace")
        .with_tag("Hymn")
        .with_section(SongSection::new(
            "Verse 1",
            vec![
                "Amazing grace how sweet the sound".to_string(),
                "That saved a wretch like me".to_string(),
            ],
        ))
}

fn sample_bible() -> Bible {
    let mut bible = Bible::new("King James Version");
    bible.abbreviation = Some("KJV".to_string());
    bible.books.push(Book {
        number: 43,
        name: "John".to_string(),
        chapters: vec![Chapter {
            number: 3,
            verses: vec![
                Verse { number: 16, text: "For God so loved the world".to_string() },
                Verse { number: 17, text: "For God sent not his Son".to_string() },
            ],
        }],
    });
    bible
}

// ── Kinds ────────────────────────────────────────────────────────

#[test]
fn kinds_are_distinct() {
    assert_eq!(Song::KIND.as_str(), "song");
    assert_eq!(Bible::KIND.as_str(), "bible");
    assert_ne!(Song::KIND, Bible::KIND);
    assert_eq!(DataKind::new("song"), Song::KIND);
    assert_eq!(Song::KIND.to_string(), "song");
}

// ── Song ─────────────────────────────────────────────────────────

#[test]
fn new_song_has_matching_timestamps() {
    let song = Song::new("Be Thou My Vision");
    assert_eq!(song.created_at(), song.modified_at());
    assert_eq!(song.name(), "Be Thou My Vision");
    assert!(song.tags().is_empty());
}

#[test]
fn song_builders_accumulate() {
    let song = amazing_grace();
    assert_eq!(song.sections.len(), 1);
    assert!(song.tags().contains(&Tag::new("hymn")));
    assert_eq!(
        song.sections[0].text(),
        "Amazing grace how sweet the sound\nThat saved a wretch like me"
    );
}

#[test]
fn touch_advances_modified_only() {
    let mut song = amazing_grace();
    let created = song.created_at();
    song.set_modified_at(created - Duration::seconds(10));
    song.touch();
    assert!(song.modified_at() > created - Duration::seconds(10));
    assert_eq!(song.created_at(), created);
}

#[test]
fn renaming_keeps_identity() {
    let mut song = amazing_grace();
    let id = song.id();
    song.set_name("Amazing Grace (My Chains Are Gone)".to_string());
    song.tags_mut().insert(Tag::new("Modern"));
    assert_eq!(song.id(), id);
    assert_eq!(song.identify(), (id, "Amazing Grace (My Chains Are Gone)"));
}

#[test]
fn song_json_roundtrip_preserves_fields() {
    let song = amazing_grace();
    let json = serde_json::to_string(&song).unwrap();
    let parsed: Song = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, song);
}

#[test]
fn song_missing_optional_fields_default() {
    let now = Utc::now().to_rfc3339();
    let json = format!(
        r#"{{"id":"{}","name":"Bare","created_at":"{now}","modified_at":"{now}"}}"#,
        lectern_types::EntityId::new()
    );
    let song: Song = serde_json::from_str(&json).unwrap();
    assert!(song.sections.is_empty());
    assert!(song.authors.is_empty());
    assert!(song.copyright.is_none());
}

// ── Bible ────────────────────────────────────────────────────────

#[test]
fn bible_verse_lookup() {
    let bible = sample_bible();
    assert_eq!(bible.verse_count(), 2);
    assert_eq!(
        bible.verse(43, 3, 16).map(|v| v.text.as_str()),
        Some("For God so loved the world")
    );
    assert!(bible.verse(43, 3, 18).is_none());
    assert!(bible.verse(1, 1, 1).is_none());
}

#[test]
fn bible_json_roundtrip_preserves_fields() {
    let bible = sample_bible();
    let json = serde_json::to_string(&bible).unwrap();
    let parsed: Bible = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, bible);
}
