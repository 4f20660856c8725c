//! TOML package definitions.
//!
//! # Example TOML
//!
//! ```toml
//! [package]
//! name = "Spanish Vocabulary"
//! version = "1.0.0"
//! author = "Your Name"
//!
//! [[models]]
//! name = "Basic Spanish"
//! fields = ["Spanish", "English", "Example"]
//! # Optional: specify which field to sort by (default: first field)
//! sort_field = "Spanish"
//!
//! [[models.templates]]
//! name = "Spanish -> English"
//! front = "{{Spanish}}"
//! back = "{{FrontSide}}<hr>{{English}}<br><i>{{Example}}</i>"
//!
//! [[decks]]
//! name = "Spanish::Vocabulary"
//! description = "Core Spanish vocabulary"
//!
//! [[notes]]
//! deck = "Spanish::Vocabulary"
//! model = "Basic Spanish"
//! tags = ["chapter1", "nouns"]
//!
//! [notes.fields]
//! Spanish = "el gato"
//! English = "the cat"
//! Example = "El gato es negro."
//!
//! [[media]]
//! name = "gato.jpg"
//! path = "images/gato.jpg"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::deck::Deck;
use crate::error::{Error, Result};
use crate::id::new_id;
use crate::media::MediaFile;
use crate::model::{Model, Template};
use crate::note::Note;
use crate::package::Package;

/// Root structure for a package definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDefinition {
    /// Package metadata.
    pub package: PackageInfo,

    /// Model (note type) definitions.
    #[serde(default)]
    pub models: Vec<ModelDef>,

    /// Deck definitions.
    #[serde(default)]
    pub decks: Vec<DeckDef>,

    /// Note definitions.
    #[serde(default)]
    pub notes: Vec<NoteDef>,

    /// Media file definitions.
    #[serde(default)]
    pub media: Vec<MediaDef>,
}

impl PackageDefinition {
    /// Load a package definition from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a package definition from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let def: PackageDefinition = toml::from_str(content)?;
        def.validate()?;
        Ok(def)
    }

    /// Validate the definition for consistency.
    pub fn validate(&self) -> Result<()> {
        let deck_names: HashSet<_> = self.decks.iter().map(|d| d.name.as_str()).collect();

        for note in &self.notes {
            let model = self
                .get_model(&note.model)
                .ok_or_else(|| Error::ModelNotFound(note.model.clone()))?;

            for field_name in note.fields.keys() {
                if !model.fields.contains(field_name) {
                    return Err(Error::FieldNotFound {
                        model: note.model.clone(),
                        field: field_name.clone(),
                    });
                }
            }

            if !deck_names.contains(note.deck.as_str()) {
                return Err(Error::DeckNotFound(note.deck.clone()));
            }
        }

        Ok(())
    }

    /// Get a model by name.
    pub fn get_model(&self, name: &str) -> Option<&ModelDef> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Get a deck by name.
    pub fn get_deck(&self, name: &str) -> Option<&DeckDef> {
        self.decks.iter().find(|d| d.name == name)
    }

    /// Get notes for a specific deck.
    pub fn notes_for_deck(&self, deck_name: &str) -> impl Iterator<Item = &NoteDef> {
        self.notes.iter().filter(move |n| n.deck == deck_name)
    }

    /// Turn the definition into a ready-to-write package.
    ///
    /// Relative media paths resolve against `media_base` when given, and
    /// against the working directory otherwise. Models and decks without an
    /// explicit id get an allocated one.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ankit_pack::PackageDefinition;
    ///
    /// # fn main() -> ankit_pack::Result<()> {
    /// let definition = PackageDefinition::from_file("spanish.toml")?;
    /// let package = definition.into_package(Some("assets".as_ref()))?;
    /// package.write_to_file("spanish.apkg")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_package(self, media_base: Option<&Path>) -> Result<Package> {
        self.validate()?;

        let models: HashMap<&str, Model> = self
            .models
            .iter()
            .map(|def| (def.name.as_str(), def.to_model()))
            .collect();

        let mut builder = Package::builder();

        for deck_def in &self.decks {
            let mut deck = Deck::new(
                deck_def.id.unwrap_or_else(new_id),
                deck_def.name.clone(),
                deck_def.description.clone().unwrap_or_default(),
            );

            for note_def in self.notes_for_deck(&deck_def.name) {
                let (Some(model), Some(model_def)) =
                    (models.get(note_def.model.as_str()), self.get_model(&note_def.model))
                else {
                    return Err(Error::ModelNotFound(note_def.model.clone()));
                };
                deck.add_note(Note::new(
                    model.id(),
                    note_def.fields_ordered(model_def),
                    note_def.tags.clone(),
                ));
            }

            builder = builder.deck(deck);
        }

        for media_def in &self.media {
            let path = resolve_media_path(&media_def.path, media_base);
            let file = MediaFile::from_path(&path)?;
            builder = builder.media_file(MediaFile::new(&media_def.name, file.data().to_vec()));
        }

        for def in &self.models {
            if let Some(model) = models.get(def.name.as_str()) {
                builder = builder.model(model.clone());
            }
        }

        builder.build()
    }
}

fn resolve_media_path(path: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match base {
        Some(base) if !path.is_absolute() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Package metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package name.
    pub name: String,

    /// Package version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Package author.
    #[serde(default)]
    pub author: Option<String>,

    /// Package description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Model (note type) definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name (must be unique).
    pub name: String,

    /// Field names in order.
    pub fields: Vec<String>,

    /// Card templates.
    pub templates: Vec<TemplateDef>,

    /// CSS styling for cards.
    #[serde(default)]
    pub css: Option<String>,

    /// Which field to sort by (default: first field).
    #[serde(default)]
    pub sort_field: Option<String>,

    /// Model ID (allocated if not specified).
    #[serde(default)]
    pub id: Option<i64>,
}

impl ModelDef {
    /// Build the [`Model`] this definition describes.
    pub fn to_model(&self) -> Model {
        let mut builder = Model::builder(self.name.clone());
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        for field in &self.fields {
            builder = builder.field(field.clone());
        }
        for template in &self.templates {
            builder = builder.template(Template::new(
                template.name.clone(),
                template.front.clone(),
                template.back.clone(),
            ));
        }
        if let Some(css) = &self.css {
            builder = builder.css(css.clone());
        }
        if let Some(sort_field) = &self.sort_field {
            builder = builder.sort_field(sort_field.clone());
        }
        builder.build()
    }
}

/// Card template definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    /// Template name.
    pub name: String,

    /// Front template (question side).
    pub front: String,

    /// Back template (answer side).
    pub back: String,
}

/// Deck definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckDef {
    /// Deck name (use :: for hierarchy, e.g., "Parent::Child").
    pub name: String,

    /// Deck description.
    #[serde(default)]
    pub description: Option<String>,

    /// Deck ID (allocated if not specified).
    #[serde(default)]
    pub id: Option<i64>,
}

/// Note definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDef {
    /// Deck name to add note to.
    pub deck: String,

    /// Model name for this note.
    pub model: String,

    /// Field values.
    pub fields: HashMap<String, String>,

    /// Tags for this note.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NoteDef {
    /// Get field values in model field order. Missing fields are empty.
    pub fn fields_ordered(&self, model: &ModelDef) -> Vec<String> {
        model
            .fields
            .iter()
            .map(|f| self.fields.get(f).cloned().unwrap_or_default())
            .collect()
    }
}

/// Media file definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDef {
    /// Filename as referenced in note fields (e.g., "audio.mp3").
    pub name: String,

    /// Path to the source file.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_TOML: &str = r#"
[package]
name = "Test Deck"
version = "1.0.0"

[[models]]
name = "Basic"
fields = ["Front", "Back"]
id = 1234

[[models.templates]]
name = "Card 1"
front = "{{Front}}"
back = "{{FrontSide}}<hr>{{Back}}"

[[decks]]
name = "Test Deck"
id = 5678

[[notes]]
deck = "Test Deck"
model = "Basic"
tags = ["test"]

[notes.fields]
Front = "Question"
Back = "Answer"
"#;

    #[test]
    fn test_parse_basic_definition() {
        let def = PackageDefinition::parse(BASIC_TOML).unwrap();
        assert_eq!(def.package.name, "Test Deck");
        assert_eq!(def.package.version, "1.0.0");
        assert_eq!(def.models.len(), 1);
        assert_eq!(def.models[0].fields, vec!["Front", "Back"]);
        assert_eq!(def.decks.len(), 1);
        assert_eq!(def.notes.len(), 1);
        assert_eq!(def.notes[0].fields.get("Front").unwrap(), "Question");
    }

    #[test]
    fn test_invalid_model_reference() {
        let toml = r#"
[package]
name = "Test"

[[decks]]
name = "Test Deck"

[[notes]]
deck = "Test Deck"
model = "NonExistent"

[notes.fields]
Front = "Q"
"#;

        let result = PackageDefinition::parse(toml);
        assert!(matches!(result, Err(Error::ModelNotFound(_))));
    }

    #[test]
    fn test_invalid_deck_reference() {
        let toml = r#"
[package]
name = "Test"

[[models]]
name = "Basic"
fields = ["Front"]

[[models.templates]]
name = "Card 1"
front = "{{Front}}"
back = "{{Front}}"

[[notes]]
deck = "NonExistent"
model = "Basic"

[notes.fields]
Front = "Q"
"#;

        let result = PackageDefinition::parse(toml);
        assert!(matches!(result, Err(Error::DeckNotFound(_))));
    }

    #[test]
    fn test_invalid_field_reference() {
        let toml = r#"
[package]
name = "Test"

[[models]]
name = "Basic"
fields = ["Front", "Back"]

[[models.templates]]
name = "Card 1"
front = "{{Front}}"
back = "{{Back}}"

[[decks]]
name = "Test Deck"

[[notes]]
deck = "Test Deck"
model = "Basic"

[notes.fields]
Front = "Q"
InvalidField = "X"
"#;

        let result = PackageDefinition::parse(toml);
        assert!(matches!(result, Err(Error::FieldNotFound { .. })));
    }

    #[test]
    fn test_fields_ordered() {
        let model = ModelDef {
            name: "Test".to_string(),
            fields: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            templates: vec![],
            css: None,
            sort_field: None,
            id: None,
        };

        let mut fields = HashMap::new();
        fields.insert("C".to_string(), "third".to_string());
        fields.insert("A".to_string(), "first".to_string());

        let note = NoteDef {
            deck: "Test".to_string(),
            model: "Test".to_string(),
            fields,
            tags: vec![],
        };

        assert_eq!(note.fields_ordered(&model), vec!["first", "", "third"]);
    }

    #[test]
    fn test_model_def_to_model() {
        let def = PackageDefinition::parse(BASIC_TOML).unwrap();
        let model = def.models[0].to_model();
        assert_eq!(model.id(), 1234);
        assert_eq!(model.fields()[1].name, "Back");
        assert_eq!(model.templates()[0].afmt, "{{FrontSide}}<hr>{{Back}}");
    }

    #[test]
    fn test_into_package() {
        let package = PackageDefinition::parse(BASIC_TOML)
            .unwrap()
            .into_package(None)
            .unwrap();
        let store = package.store();
        assert_eq!(store.note_count().unwrap(), 1);
        assert_eq!(store.card_count().unwrap(), 1);
        assert!(store.models().unwrap().contains_key("1234"));
        assert!(store.decks().unwrap().contains_key("5678"));
        assert!(crate::id::id_in_use(1234));
        assert!(crate::id::id_in_use(5678));
    }

    #[test]
    fn test_into_package_resolves_media() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.jpg"), b"meow").unwrap();

        let toml = format!(
            "{BASIC_TOML}\n[[media]]\nname = \"gato.jpg\"\npath = \"cat.jpg\"\n"
        );
        let package = PackageDefinition::parse(&toml)
            .unwrap()
            .into_package(Some(dir.path()))
            .unwrap();
        assert_eq!(package.media().get("gato.jpg").unwrap().data(), b"meow");
    }

    #[test]
    fn test_missing_media_file() {
        let toml = format!(
            "{BASIC_TOML}\n[[media]]\nname = \"gone.jpg\"\npath = \"/nowhere/gone.jpg\"\n"
        );
        let result = PackageDefinition::parse(&toml).unwrap().into_package(None);
        assert!(matches!(result, Err(Error::MediaNotFound(_))));
    }
}
