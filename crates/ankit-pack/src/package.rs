//! .apkg file generation.
//!
//! Creates Anki package files that can be imported directly into Anki. A
//! package is a ZIP archive holding the collection database as
//! `collection.anki2`, each media file under its index (`0`, `1`, ...), and
//! a `media` manifest mapping those indices back to filenames.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::deck::Deck;
use crate::error::{Context, Result};
use crate::media::{MediaFile, MediaPackager};
use crate::model::Model;
use crate::store::Store;

/// Archive entry holding the collection database.
pub const COLLECTION_ENTRY: &str = "collection.anki2";

/// Archive entry holding the media manifest.
pub const MEDIA_ENTRY: &str = "media";

/// A collection plus the media to ship with it.
pub struct Package {
    store: Store,
    media: MediaPackager,
    deck_media: MediaPackager,
}

impl Package {
    /// Wrap a store that has already been populated.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            media: MediaPackager::new(),
            deck_media: MediaPackager::new(),
        }
    }

    /// Start building a package from models and decks.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ankit_pack::{Deck, Model, Note, Package};
    ///
    /// # fn main() -> ankit_pack::Result<()> {
    /// let model = Model::basic(0, "Basic");
    /// let deck = Deck::builder("Arithmetic")
    ///     .note(Note::new(model.id(), vec!["What is 2+2?".into(), "4".into()], vec![]))
    ///     .build();
    ///
    /// let package = Package::builder().model(model).deck(deck).build()?;
    /// package.write_to_file("arithmetic.apkg")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> PackageBuilder {
        PackageBuilder::default()
    }

    /// The collection store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Package-level media.
    pub fn media(&self) -> &MediaPackager {
        &self.media
    }

    /// Package-level media, for the unsanitized [`MediaPackager::add`] path.
    pub fn media_mut(&mut self) -> &mut MediaPackager {
        &mut self.media
    }

    /// Media collected from decks at build time.
    pub fn deck_media(&self) -> &MediaPackager {
        &self.deck_media
    }

    /// Add a media file under its sanitized name.
    pub fn add_media(&mut self, filename: &str, data: Vec<u8>) -> &mut Self {
        self.media.add_file(MediaFile::new(filename, data));
        self
    }

    /// Read a media file from disk and add it under its sanitized base name.
    pub fn add_media_from_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.media.add_from_path(path)?;
        Ok(self)
    }

    /// Read a media file from `reader` and add it under the sanitized `filename`.
    pub fn add_media_from_reader(&mut self, filename: &str, reader: impl Read) -> Result<&mut Self> {
        self.media.add_from_reader(filename, reader)?;
        Ok(self)
    }

    /// Deck media overlaid by package media, in filename order.
    pub fn merged_media(&self) -> MediaPackager {
        self.deck_media.merged_with(&self.media)
    }

    /// Build the .apkg file and write it to the specified path.
    ///
    /// On error the output file may be left incomplete; the intermediate
    /// database file is always removed.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join(COLLECTION_ENTRY);
        self.store.write_database(&db_path)?;
        let db_bytes = std::fs::read(&db_path)?;

        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(COLLECTION_ENTRY, options)?;
        zip.write_all(&db_bytes)?;

        let media = self.merged_media();
        let mut manifest: BTreeMap<String, &str> = BTreeMap::new();
        for (index, (filename, data)) in media.iter().enumerate() {
            let entry = index.to_string();
            zip.start_file(entry.as_str(), options)?;
            zip.write_all(data)?;
            manifest.insert(entry, filename);
        }

        let manifest_json = serde_json::to_string(&manifest).context("encode media manifest")?;
        zip.start_file(MEDIA_ENTRY, options)?;
        zip.write_all(manifest_json.as_bytes())?;

        zip.finish()?;
        debug!(
            path = %path.display(),
            database_bytes = db_bytes.len(),
            media = manifest.len(),
            "wrote package"
        );
        Ok(())
    }
}

/// Builder for [`Package`].
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    models: Vec<Model>,
    decks: Vec<Deck>,
    media: MediaPackager,
}

impl PackageBuilder {
    /// Register a model.
    pub fn model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Register a deck together with its notes and media.
    pub fn deck(mut self, deck: Deck) -> Self {
        self.decks.push(deck);
        self
    }

    /// Add package-level media under its sanitized name.
    pub fn media(mut self, filename: &str, data: Vec<u8>) -> Self {
        self.media.add_file(MediaFile::new(filename, data));
        self
    }

    /// Add an already constructed media file.
    pub fn media_file(mut self, file: MediaFile) -> Self {
        self.media.add_file(file);
        self
    }

    /// Create the store and fill it.
    ///
    /// Models go in first, then decks, then every deck's notes. A note whose
    /// model was registered gets one card per template of that model; any
    /// other note gets a single card for template `0`.
    pub fn build(self) -> Result<Package> {
        let store = Store::create()?;

        for model in &self.models {
            store.add_model(model)?;
        }
        for deck in &self.decks {
            store.add_deck(deck)?;
        }

        let mut deck_media = MediaPackager::new();
        for deck in &self.decks {
            for note in deck.notes() {
                store.add_note(note)?;

                let templates = self
                    .models
                    .iter()
                    .find(|m| m.id() == note.model_id())
                    .map(|m| m.templates().len())
                    .unwrap_or(0);
                for ord in 0..templates.max(1) {
                    store.add_card(note.id(), deck.id(), ord)?;
                }
            }

            for (filename, data) in deck.media() {
                deck_media.add(filename.clone(), data.clone());
            }
        }

        debug!(
            models = self.models.len(),
            decks = self.decks.len(),
            "built package"
        );
        Ok(Package {
            store,
            media: self.media,
            deck_media,
        })
    }
}
