//! Decks and the notes and media they carry before packaging.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::id::{STANDARD_DECK_ID, reserve_id};
use crate::note::Note;

/// A deck with its notes and media.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    id: i64,
    name: String,
    description: String,
    notes: Vec<Note>,
    media: BTreeMap<String, Vec<u8>>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl Deck {
    /// Create an empty deck.
    ///
    /// An id of `0` selects [`STANDARD_DECK_ID`]. Use `::` in the name for
    /// hierarchy, e.g. `"Spanish::Vocabulary"`.
    pub fn new(id: i64, name: impl Into<String>, description: impl Into<String>) -> Self {
        let id = if id == 0 { STANDARD_DECK_ID } else { id };
        reserve_id(id);
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            notes: Vec::new(),
            media: BTreeMap::new(),
            created: now,
            modified: now,
        }
    }

    /// Start building a deck with the standard deck id.
    ///
    /// # Example
    ///
    /// ```
    /// use ankit_pack::{Deck, Note};
    ///
    /// let deck = Deck::builder("Geography")
    ///     .id(2059400110)
    ///     .description("Capitals")
    ///     .note(Note::new(1607392319, vec!["France".into(), "Paris".into()], vec![]))
    ///     .build();
    /// assert_eq!(deck.notes().len(), 1);
    /// ```
    pub fn builder(name: impl Into<String>) -> DeckBuilder {
        DeckBuilder {
            deck: Deck::new(0, name, ""),
        }
    }

    /// Deck id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Deck name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deck description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Notes added to this deck.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Media attached to this deck, keyed by filename.
    pub fn media(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.media
    }

    /// Creation time.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Last time a note or media file was added.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Append a note.
    pub fn add_note(&mut self, note: Note) -> &mut Self {
        self.notes.push(note);
        self.modified = Utc::now();
        self
    }

    /// Attach a media file. The name is stored as given.
    pub fn add_media(&mut self, filename: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.media.insert(filename.into(), data);
        self.modified = Utc::now();
        self
    }
}

/// Builder for [`Deck`].
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    deck: Deck,
}

impl DeckBuilder {
    /// Use an explicit id. `0` keeps the standard deck id.
    pub fn id(mut self, id: i64) -> Self {
        if id != 0 {
            reserve_id(id);
            self.deck.id = id;
        }
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.deck.description = description.into();
        self
    }

    /// Append a note.
    pub fn note(mut self, note: Note) -> Self {
        self.deck.add_note(note);
        self
    }

    /// Attach a media file.
    pub fn media(mut self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.deck.add_media(filename, data);
        self
    }

    /// Finish the deck.
    pub fn build(self) -> Deck {
        self.deck
    }
}
