//! Models (note types): fields, card templates, and styling.

use crate::id::{STANDARD_BASIC_MODEL_ID, STANDARD_CLOZE_MODEL_ID, new_id, reserve_id};

/// Marker that makes a template a cloze template.
pub const CLOZE_MARKER: &str = "{{cloze:";

/// Default CSS for cards.
pub const DEFAULT_CSS: &str = r#".card {
    font-family: arial;
    font-size: 20px;
    text-align: center;
    color: black;
    background-color: white;
    line-height: 1.2;
}
"#;

/// Whether a model produces standard or cloze cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Front/back cards, `type: 0`.
    Standard,
    /// Cloze deletion cards, `type: 1`.
    Cloze,
}

impl ModelKind {
    /// The `type` tag written into the model JSON.
    pub fn as_i32(self) -> i32 {
        match self {
            ModelKind::Standard => 0,
            ModelKind::Cloze => 1,
        }
    }
}

/// A field of a model, with its editor display attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Position in the owning model.
    pub ord: usize,
    /// Keep the value when adding the next note.
    pub sticky: bool,
    /// Right-to-left text.
    pub rtl: bool,
    /// Editor font.
    pub font: String,
    /// Editor font size.
    pub size: u32,
    /// Editor text color.
    pub color: String,
    /// Editor alignment.
    pub align: String,
}

impl Field {
    /// A field with Arial 20, black, left aligned.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ord: 0,
            sticky: false,
            rtl: false,
            font: "Arial".to_string(),
            size: 20,
            color: "#000000".to_string(),
            align: "left".to_string(),
        }
    }
}

/// A card template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Position in the owning model.
    pub ord: usize,
    /// Question format.
    pub qfmt: String,
    /// Answer format.
    pub afmt: String,
    /// Browser question format.
    pub bqfmt: Option<String>,
    /// Browser answer format.
    pub bafmt: Option<String>,
}

impl Template {
    /// A template with the given question and answer formats.
    pub fn new(name: impl Into<String>, qfmt: impl Into<String>, afmt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ord: 0,
            qfmt: qfmt.into(),
            afmt: afmt.into(),
            bqfmt: None,
            bafmt: None,
        }
    }

    /// Set the browser-specific formats.
    pub fn browser_formats(mut self, bqfmt: impl Into<String>, bafmt: impl Into<String>) -> Self {
        self.bqfmt = Some(bqfmt.into());
        self.bafmt = Some(bafmt.into());
        self
    }

    fn is_cloze(&self) -> bool {
        self.qfmt.contains(CLOZE_MARKER) || self.afmt.contains(CLOZE_MARKER)
    }
}

/// A note type definition.
///
/// `ord` of every field and template equals its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    id: i64,
    name: String,
    fields: Vec<Field>,
    templates: Vec<Template>,
    css: String,
    sort_field: usize,
}

impl Model {
    /// An empty model with the default stylesheet. `id` is reserved process-wide.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        reserve_id(id);
        Self {
            id,
            name: name.into(),
            fields: Vec::new(),
            templates: Vec::new(),
            css: DEFAULT_CSS.to_string(),
            sort_field: 0,
        }
    }

    /// Start building a model with an allocated id.
    ///
    /// # Example
    ///
    /// ```
    /// use ankit_pack::{Model, Template};
    ///
    /// let model = Model::builder("Vocabulary")
    ///     .field("Word")
    ///     .field("Meaning")
    ///     .template(Template::new("Recall", "{{Word}}", "{{FrontSide}}<hr>{{Meaning}}"))
    ///     .build();
    /// assert_eq!(model.fields()[1].ord, 1);
    /// ```
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    /// The stock two-field "Front"/"Back" model.
    ///
    /// An id of `0` selects [`STANDARD_BASIC_MODEL_ID`].
    pub fn basic(id: i64, name: impl Into<String>) -> Self {
        let id = if id == 0 { STANDARD_BASIC_MODEL_ID } else { id };
        Self::builder(name)
            .id(id)
            .field("Front")
            .field("Back")
            .template(Template::new(
                "Card 1",
                "{{Front}}",
                "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}",
            ))
            .build()
    }

    /// The stock "Text"/"Extra" cloze model.
    ///
    /// An id of `0` selects [`STANDARD_CLOZE_MODEL_ID`].
    pub fn cloze(id: i64, name: impl Into<String>) -> Self {
        let id = if id == 0 { STANDARD_CLOZE_MODEL_ID } else { id };
        Self::builder(name)
            .id(id)
            .field("Text")
            .field("Extra")
            .template(Template::new(
                "Cloze",
                "{{cloze:Text}}\n\n{{Extra}}",
                "{{cloze:Text}}\n\n{{Extra}}",
            ))
            .build()
    }

    /// Continue customizing this model.
    pub fn into_builder(self) -> ModelBuilder {
        ModelBuilder {
            model: self,
            sort_field_name: None,
        }
    }

    /// Model id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Templates in order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Card stylesheet.
    pub fn css(&self) -> &str {
        &self.css
    }

    /// Index of the field the browser sorts by.
    pub fn sort_field_index(&self) -> usize {
        self.sort_field
    }

    /// Cloze if any template references a cloze field, standard otherwise.
    pub fn kind(&self) -> ModelKind {
        if self.templates.iter().any(Template::is_cloze) {
            ModelKind::Cloze
        } else {
            ModelKind::Standard
        }
    }

    fn add_field(&mut self, mut field: Field) {
        field.ord = self.fields.len();
        self.fields.push(field);
    }

    fn add_template(&mut self, mut template: Template) {
        template.ord = self.templates.len();
        self.templates.push(template);
    }
}

/// Builder for [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: Model,
    sort_field_name: Option<String>,
}

impl ModelBuilder {
    /// Start a model named `name` with an allocated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            model: Model::new(new_id(), name),
            sort_field_name: None,
        }
    }

    /// Use an explicit id, reserving it process-wide.
    pub fn id(mut self, id: i64) -> Self {
        reserve_id(id);
        self.model.id = id;
        self
    }

    /// Append a field with default display attributes.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.field_def(Field::new(name))
    }

    /// Append a fully specified field. Its `ord` is overwritten.
    pub fn field_def(mut self, field: Field) -> Self {
        self.model.add_field(field);
        self
    }

    /// Append a template. Its `ord` is overwritten.
    pub fn template(mut self, template: Template) -> Self {
        self.model.add_template(template);
        self
    }

    /// Replace the stylesheet.
    pub fn css(mut self, css: impl Into<String>) -> Self {
        self.model.css = css.into();
        self
    }

    /// Sort the browser by the named field. Unknown names fall back to the first field.
    pub fn sort_field(mut self, name: impl Into<String>) -> Self {
        self.sort_field_name = Some(name.into());
        self
    }

    /// Finish the model.
    pub fn build(mut self) -> Model {
        if let Some(name) = self.sort_field_name {
            self.model.sort_field = self
                .model
                .fields
                .iter()
                .position(|f| f.name == name)
                .unwrap_or(0);
        }
        self.model
    }
}
