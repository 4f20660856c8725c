//! The collection database: notes, cards, and the `col` row.
//!
//! A [`Store`] is an in-memory SQLite database laid out in Anki's schema
//! version 11. Models and decks live as JSON dictionaries inside the single
//! `col` row; each addition reads the dictionary, replaces one key, and
//! writes it back, so repeated additions accumulate.

use std::path::Path;

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::collection::{
    Collection, CollectionConfig, DeckConfig, DeckConfigMap, DeckMap, DeckRecord, ModelMap,
    ModelRecord, SCHEMA_VERSION,
};
use crate::deck::Deck;
use crate::error::{Context, Error, Result};
use crate::id::{DEFAULT_DECK_CONFIG_ID, new_id};
use crate::model::Model;
use crate::note::Note;
use crate::sql::{PRAGMAS, SCHEMA, TABLES, USN_NEEDS_SYNC, new_card};

/// The `data` column of a note.
#[derive(Serialize)]
struct NoteData<'a> {
    tags: &'a [String],
}

/// An Anki collection under construction.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open a fresh in-memory store with the schema and the collection row.
    pub fn create() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open database")?;
        initialize(&conn)?;
        let store = Self { conn };
        store.insert_collection(&ModelMap::new(), &CollectionConfig::default())?;
        debug!("created collection store");
        Ok(store)
    }

    /// The underlying connection, for queries the store does not wrap.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Add or replace a model in the collection's model dictionary.
    ///
    /// Also re-establishes the default deck options group under key `"1"`
    /// and makes this model the collection's current model.
    pub fn add_model(&self, model: &Model) -> Result<()> {
        let now = Utc::now().timestamp();
        let existing = self.read_column("models")?;

        let mut models: ModelMap = decode_or_empty(existing.as_deref(), "models");
        models.insert(model.id().to_string(), ModelRecord::from_model(model, now));

        match existing {
            None => {
                let mut conf = CollectionConfig::default();
                conf.select_model(model.id());
                self.insert_collection(&models, &conf)?;
            }
            Some(_) => {
                let mut conf: CollectionConfig = self
                    .read_column("conf")?
                    .and_then(|json| serde_json::from_str(&json).ok())
                    .unwrap_or_default();
                conf.select_model(model.id());

                let mut dconf: DeckConfigMap =
                    decode_or_empty(self.read_column("dconf")?.as_deref(), "dconf");
                dconf.insert(
                    DEFAULT_DECK_CONFIG_ID.to_string(),
                    DeckConfig::default_group(now),
                );

                self.conn
                    .execute(
                        "UPDATE col SET models = ?, dconf = ?, conf = ?, mod = ? WHERE id = 1",
                        params![
                            encode(&models, "encode models")?,
                            encode(&dconf, "encode deck options")?,
                            encode(&conf, "encode collection config")?,
                            now * 1000
                        ],
                    )
                    .context("update models")?;
            }
        }

        debug!(id = model.id(), name = model.name(), "added model");
        Ok(())
    }

    /// Add or replace a deck in the collection's deck dictionary.
    ///
    /// Fails with [`Error::MissingCollection`] if the `col` row is gone.
    pub fn add_deck(&self, deck: &Deck) -> Result<()> {
        let now = Utc::now().timestamp();
        let existing = self
            .read_column("decks")?
            .ok_or(Error::MissingCollection)?;

        let mut decks: DeckMap = decode_or_empty(Some(existing.as_str()), "decks");
        decks.insert(deck.id().to_string(), DeckRecord::from_deck(deck, now));

        self.conn
            .execute(
                "UPDATE col SET decks = ?, mod = ? WHERE id = 1",
                params![encode(&decks, "encode decks")?, now * 1000],
            )
            .context("update decks")?;

        debug!(id = deck.id(), name = deck.name(), "added deck");
        Ok(())
    }

    /// Insert a note row.
    pub fn add_note(&self, note: &Note) -> Result<()> {
        let tags = encode(note.tags(), "encode note tags")?;
        let data = encode(&NoteData { tags: note.tags() }, "encode note data")?;

        self.conn
            .execute(
                "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
                params![
                    note.id(),
                    note.guid(),
                    note.model_id(),
                    note.modified().timestamp(),
                    USN_NEEDS_SYNC,
                    tags,
                    note.encoded_fields(),
                    note.sort_field(),
                    note.checksum(),
                    data
                ],
            )
            .context("insert note")?;

        debug!(id = note.id(), model = note.model_id(), "added note");
        Ok(())
    }

    /// Insert a new card for `note_id` in `deck_id` using template `ord`.
    ///
    /// Returns the allocated card id.
    pub fn add_card(&self, note_id: i64, deck_id: i64, ord: usize) -> Result<i64> {
        let card_id = new_id();
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, 0, 0, 0, '{}')",
                params![
                    card_id,
                    note_id,
                    deck_id,
                    ord as i64,
                    now,
                    USN_NEEDS_SYNC,
                    new_card::TYPE,
                    new_card::QUEUE,
                    new_card::DUE,
                    new_card::INTERVAL,
                    new_card::FACTOR
                ],
            )
            .context("insert card")?;

        debug!(id = card_id, note = note_id, deck = deck_id, ord, "added card");
        Ok(card_id)
    }

    /// Number of rows in `notes`.
    pub fn note_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .context("count notes")
    }

    /// Number of rows in `cards`.
    pub fn card_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
            .context("count cards")
    }

    /// The model dictionary as currently stored.
    pub fn models(&self) -> Result<ModelMap> {
        Ok(self.collection()?.models)
    }

    /// The deck dictionary as currently stored.
    pub fn decks(&self) -> Result<DeckMap> {
        Ok(self.collection()?.decks)
    }

    /// Decode the whole `col` row. Unlike additions, this is strict about JSON.
    pub fn collection(&self) -> Result<Collection> {
        let row = self
            .conn
            .query_row(
                "SELECT crt, mod, scm, ver, conf, models, decks, dconf, tags FROM col WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()
            .context("read collection")?
            .ok_or(Error::MissingCollection)?;

        let (crt, modified, scm, ver, conf, models, decks, dconf, tags) = row;
        Ok(Collection {
            crt,
            modified,
            scm,
            ver,
            conf: serde_json::from_str(&conf).context("decode collection config")?,
            models: serde_json::from_str(&models).context("decode models")?,
            decks: serde_json::from_str(&decks).context("decode decks")?,
            dconf: serde_json::from_str(&dconf).context("decode deck options")?,
            tags: serde_json::from_str(&tags).context("decode tags")?,
        })
    }

    /// Copy every table into a standalone database file at `path`.
    ///
    /// The copy runs in one transaction and the result is vacuumed.
    pub fn write_database(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut dest = Connection::open(path.as_ref()).context("open destination database")?;
        initialize(&dest)?;

        let tx = dest.transaction().context("begin copy transaction")?;
        for table in TABLES {
            let copied = copy_table(&self.conn, &tx, table)?;
            debug!(table, rows = copied, "copied table");
        }
        tx.commit().context("commit copy transaction")?;

        dest.execute_batch("VACUUM").context("vacuum database")?;
        Ok(())
    }

    fn insert_collection(&self, models: &ModelMap, conf: &CollectionConfig) -> Result<()> {
        let now = Utc::now().timestamp();
        let dconf = DeckConfig::default_map(now);

        self.conn
            .execute(
                "INSERT OR REPLACE INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
                 VALUES (1, ?, ?, ?, ?, 0, 0, 0, ?, ?, '{}', ?, '{}')",
                params![
                    now,
                    now * 1000,
                    now * 1000,
                    SCHEMA_VERSION,
                    encode(conf, "encode collection config")?,
                    encode(models, "encode models")?,
                    encode(&dconf, "encode deck options")?
                ],
            )
            .context("insert collection")?;
        Ok(())
    }

    /// Read one JSON column of the collection row; `None` if the row is missing.
    fn read_column(&self, column: &'static str) -> Result<Option<String>> {
        self.conn
            .query_row(&format!("SELECT {column} FROM col WHERE id = 1"), [], |row| {
                row.get(0)
            })
            .optional()
            .context("read collection")
    }
}

/// Apply pragmas and create the schema on `conn`.
fn initialize(conn: &Connection) -> Result<()> {
    for (name, value) in PRAGMAS {
        // Some pragmas (journal_mode) answer with a row; drain it.
        let mut stmt = conn
            .prepare(&format!("PRAGMA {name} = {value}"))
            .context("set pragma")?;
        let mut rows = stmt.query([]).context("set pragma")?;
        while rows.next().context("set pragma")?.is_some() {}
    }
    conn.execute_batch(SCHEMA).context("create schema")
}

fn copy_table(src: &Connection, dest: &Connection, table: &str) -> Result<usize> {
    let mut select = src
        .prepare(&format!("SELECT * FROM {table}"))
        .context("read table")?;
    let columns: Vec<String> = select
        .column_names()
        .into_iter()
        .map(|c| format!("\"{c}\""))
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut insert = dest
        .prepare(&format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        ))
        .context("prepare row copy")?;

    let mut rows = select.query([]).context("read table")?;
    let mut copied = 0;
    while let Some(row) = rows.next().context("read row")? {
        let values = (0..columns.len())
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read row")?;
        insert
            .execute(params_from_iter(values))
            .context("copy row")?;
        copied += 1;
    }
    Ok(copied)
}

fn encode<T: Serialize + ?Sized>(value: &T, step: &'static str) -> Result<String> {
    serde_json::to_string(value).context(step)
}

/// Decode a dictionary column, substituting an empty dictionary when the
/// stored JSON is absent or malformed.
// TODO: a malformed dictionary silently drops earlier entries; decide whether
// this should become an error once callers can recover from it.
fn decode_or_empty<T: DeserializeOwned + Default>(json: Option<&str>, column: &str) -> T {
    match json {
        None => T::default(),
        Some(json) => serde_json::from_str(json).unwrap_or_else(|err| {
            warn!(column, %err, "malformed collection dictionary, starting empty");
            T::default()
        }),
    }
}
