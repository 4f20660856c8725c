//! Build Anki `.apkg` packages without a running Anki.
//!
//! The crate assembles a schema-11 collection database in memory, fills it
//! with note types (models), decks, notes and cards, and writes it out as a
//! ZIP archive together with any media files. The result imports directly
//! into Anki.
//!
//! Content can be put together in code:
//!
//! ```no_run
//! use ankit_pack::{Deck, Model, Note, Package};
//!
//! # fn main() -> ankit_pack::Result<()> {
//! let model = Model::basic(0, "Basic");
//! let mut deck = Deck::new(0, "Capitals", "European capitals");
//! deck.add_note(Note::new(
//!     model.id(),
//!     vec!["France".into(), "Paris".into()],
//!     vec!["geography".into()],
//! ));
//!
//! let mut package = Package::builder().model(model).deck(deck).build()?;
//! package.add_media("flag.png", std::fs::read("flag.png")?);
//! package.write_to_file("capitals.apkg")?;
//! # Ok(())
//! # }
//! ```
//!
//! or loaded from a TOML definition:
//!
//! ```toml
//! [package]
//! name = "Spanish Vocabulary"
//!
//! [[models]]
//! name = "Basic Spanish"
//! fields = ["Spanish", "English"]
//!
//! [[models.templates]]
//! name = "Spanish -> English"
//! front = "{{Spanish}}"
//! back = "{{FrontSide}}<hr>{{English}}"
//!
//! [[decks]]
//! name = "Spanish::Vocabulary"
//!
//! [[notes]]
//! deck = "Spanish::Vocabulary"
//! model = "Basic Spanish"
//!
//! [notes.fields]
//! Spanish = "el gato"
//! English = "the cat"
//! ```
//!
//! ```no_run
//! use ankit_pack::PackageDefinition;
//!
//! # fn main() -> ankit_pack::Result<()> {
//! let package = PackageDefinition::from_file("spanish.toml")?.into_package(None)?;
//! package.write_to_file("spanish.apkg")?;
//! # Ok(())
//! # }
//! ```
//!
//! The lower level [`Store`] is available for callers that want to control
//! exactly which rows are written.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod definition;
pub mod error;
pub mod sql;

mod deck;
mod id;
mod media;
mod model;
mod note;
mod package;
mod store;

pub use deck::{Deck, DeckBuilder};
pub use definition::{
    DeckDef, MediaDef, ModelDef, NoteDef, PackageDefinition, PackageInfo, TemplateDef,
};
pub use error::{Error, Result};
pub use id::{
    DEFAULT_DECK_CONFIG_ID, DEFAULT_DECK_ID, IdAllocator, STANDARD_BASIC_MODEL_ID,
    STANDARD_CLOZE_MODEL_ID, STANDARD_DECK_ID, id_in_use, new_id, reserve_id,
};
pub use media::{INVALID_FILENAME_CHARS, MediaFile, MediaPackager, media_hash, sanitize_filename};
pub use model::{CLOZE_MARKER, DEFAULT_CSS, Field, Model, ModelBuilder, ModelKind, Template};
pub use note::{FIELD_SEPARATOR, Note, field_checksum, join_fields, split_fields};
pub use package::{COLLECTION_ENTRY, MEDIA_ENTRY, Package, PackageBuilder};
pub use store::Store;
