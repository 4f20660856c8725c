//! Integration tests for .apkg generation.
//!
//! These tests build actual .apkg files and verify their contents
//! by inspecting the SQLite database and ZIP structure.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use ankit_pack::{
    Deck, Error, FIELD_SEPARATOR, Model, ModelKind, Note, Package, PackageDefinition,
    STANDARD_BASIC_MODEL_ID, STANDARD_CLOZE_MODEL_ID, STANDARD_DECK_ID, Store, Template,
    field_checksum,
};
use rusqlite::Connection;
use tempfile::{TempDir, tempdir};
use zip::ZipArchive;

/// Extract `collection.anki2` next to the package and open it.
///
/// The returned directory must outlive the connection.
fn open_apkg_database(apkg_path: &Path) -> (TempDir, Connection) {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("collection.anki2");
    std::fs::write(&db_path, read_entry(apkg_path, "collection.anki2")).unwrap();
    let conn = Connection::open(&db_path).unwrap();
    (temp_dir, conn)
}

fn read_entry(apkg_path: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(apkg_path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

fn entry_names(apkg_path: &Path) -> Vec<String> {
    let file = std::fs::File::open(apkg_path).unwrap();
    let archive = ZipArchive::new(file).unwrap();
    archive.file_names().map(String::from).collect()
}

fn get_media_manifest(apkg_path: &Path) -> HashMap<String, String> {
    serde_json::from_slice(&read_entry(apkg_path, "media")).unwrap()
}

fn col_json(conn: &Connection, column: &str) -> serde_json::Value {
    let text: String = conn
        .query_row(&format!("SELECT {column} FROM col"), [], |row| row.get(0))
        .unwrap();
    serde_json::from_str(&text).unwrap()
}

fn fields(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// One basic note with no media, as produced by the store directly.
#[test]
fn test_single_basic_note() {
    let model = Model::basic(0, "Basic");
    let deck = Deck::new(0, "Default", "");
    let note = Note::new(model.id(), fields(&["Q", "A"]), vec![]);

    let store = Store::create().unwrap();
    store.add_model(&model).unwrap();
    store.add_deck(&deck).unwrap();
    store.add_note(&note).unwrap();
    store.add_card(note.id(), deck.id(), 0).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("basic.apkg");
    Package::new(store).write_to_file(&path).unwrap();

    assert_eq!(entry_names(&path), vec!["collection.anki2", "media"]);
    assert_eq!(read_entry(&path, "media"), b"{}");

    let (_dir, conn) = open_apkg_database(&path);
    let (flds, sfld, csum, mid): (String, String, i64, i64) = conn
        .query_row("SELECT flds, sfld, csum, mid FROM notes", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap();
    assert_eq!(flds, "Q\u{1f}A");
    assert_eq!(sfld, "Q");
    assert_eq!(csum, 81);
    assert_eq!(mid, STANDARD_BASIC_MODEL_ID);

    let (did, ord, ctype, queue, factor): (i64, i64, i64, i64, i64) = conn
        .query_row(
            "SELECT did, ord, type, queue, factor FROM cards",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .unwrap();
    assert_eq!(did, STANDARD_DECK_ID);
    assert_eq!((ord, ctype, queue, factor), (0, 0, 0, 2500));
}

/// Sanitized media names end up in the manifest with contiguous indices.
#[test]
fn test_media_manifest_with_sanitized_names() {
    let mut package = Package::new(Store::create().unwrap());
    package.add_media("a.png", vec![1, 2, 3]);
    package.add_media("b:c.png", vec![9]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("media.apkg");
    package.write_to_file(&path).unwrap();

    let manifest = get_media_manifest(&path);
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest["0"], "a.png");
    assert_eq!(manifest["1"], "b_c.png");
    assert_eq!(read_entry(&path, "0"), vec![1, 2, 3]);
    assert_eq!(read_entry(&path, "1"), vec![9]);

    let names = entry_names(&path);
    assert_eq!(names.first().map(String::as_str), Some("collection.anki2"));
    assert_eq!(names.last().map(String::as_str), Some("media"));
}

/// Adding two models accumulates both in the dictionary.
#[test]
fn test_models_accumulate() {
    let store = Store::create().unwrap();
    store.add_model(&Model::basic(0, "Basic")).unwrap();
    store.add_model(&Model::cloze(0, "Cloze")).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("models.apkg");
    Package::new(store).write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let models = col_json(&conn, "models");
    let basic = &models[STANDARD_BASIC_MODEL_ID.to_string()];
    let cloze = &models[STANDARD_CLOZE_MODEL_ID.to_string()];
    assert_eq!(basic["type"], 0);
    assert_eq!(cloze["type"], 1);
    assert_eq!(cloze["name"], "Cloze");

    let conf = col_json(&conn, "conf");
    assert_eq!(conf["curModel"], STANDARD_CLOZE_MODEL_ID);

    let dconf = col_json(&conn, "dconf");
    assert_eq!(dconf["1"]["new"]["perDay"], 20);
}

#[test]
fn test_apkg_database_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schema.apkg");
    Package::new(Store::create().unwrap())
        .write_to_file(&path)
        .unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(tables, vec!["cards", "col", "graves", "notes", "revlog"]);

    let (ver, rows): (i64, i64) = conn
        .query_row("SELECT ver, (SELECT COUNT(*) FROM col) FROM col", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(ver, 11);
    assert_eq!(rows, 1);
}

#[test]
fn test_apkg_note_tags_and_guid() {
    let model = Model::basic(0, "Basic");
    let note = Note::new(
        model.id(),
        fields(&["Front", "Back"]),
        vec!["geo".into(), "europe".into()],
    );
    let note_id = note.id();
    let deck = Deck::builder("Tags").note(note).build();
    let package = Package::builder().model(model).deck(deck).build().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let (guid, tags, data, usn): (String, String, String, i64) = conn
        .query_row("SELECT guid, tags, data, usn FROM notes", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap();
    assert_eq!(guid, format!("{note_id:x}"));
    assert_eq!(tags, r#"["geo","europe"]"#);
    assert_eq!(data, r#"{"tags":["geo","europe"]}"#);
    assert_eq!(usn, -1);
}

#[test]
fn test_apkg_checksum_uses_first_field() {
    let model = Model::basic(0, "Basic");
    let deck = Deck::builder("Sums")
        .note(Note::new(model.id(), fields(&["héllo", "x"]), vec![]))
        .build();
    let package = Package::builder().model(model).deck(deck).build().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("sums.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let (flds, csum): (String, i64) = conn
        .query_row("SELECT flds, csum FROM notes", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(flds, format!("héllo{FIELD_SEPARATOR}x"));
    assert_eq!(csum, field_checksum("héllo"));
    assert_eq!(csum, "héllo".chars().map(|c| c as i64).sum::<i64>() % 65536);
}

#[test]
fn test_apkg_cards_reference_correct_notes() {
    let model = Model::builder("Two Way")
        .field("Front")
        .field("Back")
        .template(Template::new("Forward", "{{Front}}", "{{Back}}"))
        .template(Template::new("Reverse", "{{Back}}", "{{Front}}"))
        .build();
    let deck = Deck::builder("Both Ways")
        .note(Note::new(model.id(), fields(&["one", "uno"]), vec![]))
        .note(Note::new(model.id(), fields(&["two", "dos"]), vec![]))
        .build();
    let deck_id = deck.id();
    let package = Package::builder().model(model).deck(deck).build().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("two-way.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM cards WHERE nid NOT IN (SELECT id FROM notes)",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);

    let per_note: Vec<(i64, i64)> = conn
        .prepare("SELECT COUNT(*), SUM(ord) FROM cards GROUP BY nid")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(per_note, vec![(2, 1), (2, 1)]);

    let wrong_deck: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM cards WHERE did != ?",
            [deck_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(wrong_deck, 0);
}

#[test]
fn test_apkg_deck_in_col() {
    let deck = Deck::builder("Parent::Child")
        .id(424242)
        .description("Nested deck")
        .build();
    let package = Package::builder().deck(deck).build().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("deck.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let decks = col_json(&conn, "decks");
    let deck = &decks["424242"];
    assert_eq!(deck["name"], "Parent::Child");
    assert_eq!(deck["desc"], "Nested deck");
    assert_eq!(deck["usn"], -1);
    assert!(decks.get("1").is_none());
}

#[test]
fn test_apkg_model_css_and_sort_field() {
    let model = Model::builder("Styled")
        .id(99)
        .field("Word")
        .field("Meaning")
        .template(Template::new("Card 1", "{{Meaning}}", "{{Word}}"))
        .css(".card { color: red; }")
        .sort_field("Meaning")
        .build();
    let deck = Deck::builder("Styled")
        .note(Note::new(99, fields(&["perro", "dog"]), vec![]))
        .build();
    let package = Package::builder().model(model).deck(deck).build().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("styled.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let models = col_json(&conn, "models");
    assert_eq!(models["99"]["css"], ".card { color: red; }");
    assert_eq!(models["99"]["sortf"], 1);
    assert_eq!(models["99"]["flds"][1]["name"], "Meaning");
    assert_eq!(models["99"]["tmpls"][0]["qfmt"], "{{Meaning}}");
}

#[test]
fn test_model_kind_follows_templates() {
    assert_eq!(Model::basic(0, "Basic").kind(), ModelKind::Standard);
    assert_eq!(Model::cloze(0, "Cloze").kind(), ModelKind::Cloze);
}

#[test]
fn test_deck_and_package_media_are_merged() {
    let deck = Deck::builder("With Media")
        .media("shared.mp3", b"deck".to_vec())
        .media("deck-only.mp3", b"d".to_vec())
        .build();
    let package = Package::builder()
        .deck(deck)
        .media("shared.mp3", b"package".to_vec())
        .build()
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("merged.apkg");
    package.write_to_file(&path).unwrap();

    let manifest = get_media_manifest(&path);
    assert_eq!(manifest.len(), 2);
    let shared_index = manifest
        .iter()
        .find(|(_, name)| name.as_str() == "shared.mp3")
        .map(|(index, _)| index.clone())
        .unwrap();
    assert_eq!(read_entry(&path, &shared_index), b"package");
}

#[test]
fn test_toml_definition_end_to_end() {
    let toml = r#"
[package]
name = "Vocabulary"

[[models]]
name = "Vocab"
fields = ["Word", "Meaning"]

[[models.templates]]
name = "Recognize"
front = "{{Word}}"
back = "{{FrontSide}}<hr>{{Meaning}}"

[[models.templates]]
name = "Recall"
front = "{{Meaning}}"
back = "{{FrontSide}}<hr>{{Word}}"

[[decks]]
name = "Vocabulary"

[[notes]]
deck = "Vocabulary"
model = "Vocab"
tags = ["animals"]

[notes.fields]
Word = "gato"
Meaning = "cat"

[[media]]
name = "gato:1.mp3"
path = "gato.mp3"
"#;

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("gato.mp3"), b"miau").unwrap();

    let package = PackageDefinition::parse(toml)
        .unwrap()
        .into_package(Some(dir.path()))
        .unwrap();
    let path = dir.path().join("vocab.apkg");
    package.write_to_file(&path).unwrap();

    let (_dir, conn) = open_apkg_database(&path);
    let cards: i64 = conn
        .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
        .unwrap();
    assert_eq!(cards, 2);

    let manifest = get_media_manifest(&path);
    assert_eq!(manifest["0"], "gato_1.mp3");
    assert_eq!(read_entry(&path, "0"), b"miau");
}

#[test]
fn test_toml_definition_rejects_unknown_model() {
    let toml = r#"
[package]
name = "Broken"

[[decks]]
name = "Deck"

[[notes]]
deck = "Deck"
model = "Missing"

[notes.fields]
Front = "Q"
"#;
    assert!(matches!(
        PackageDefinition::parse(toml),
        Err(Error::ModelNotFound(name)) if name == "Missing"
    ));
}
