//! Notes and the field encoding used by the `notes` table.
//!
//! Anki stores all of a note's fields in one `flds` column, joined by the
//! ASCII unit separator (`0x1f`). No escaping is applied, so field values
//! must not contain that byte themselves.

use chrono::{DateTime, Utc};

use crate::id::{new_id, reserve_id};

/// Field separator character (ASCII unit separator).
pub const FIELD_SEPARATOR: char = '\x1f';

/// One piece of content instantiated from a model.
///
/// The field count and order must match the owning model; this is not
/// checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: i64,
    model_id: i64,
    fields: Vec<String>,
    tags: Vec<String>,
    modified: DateTime<Utc>,
    sort_field: String,
    checksum: i64,
}

impl Note {
    /// Create a note with a freshly allocated id.
    ///
    /// # Example
    ///
    /// ```
    /// use ankit_pack::Note;
    ///
    /// let note = Note::new(1607392319, vec!["What is 2+2?".into(), "4".into()], vec![]);
    /// assert_eq!(note.sort_field(), "What is 2+2?");
    /// ```
    pub fn new(model_id: i64, fields: Vec<String>, tags: Vec<String>) -> Self {
        Self::with_id(new_id(), model_id, fields, tags)
    }

    /// Create a note with an explicit id, reserving it process-wide.
    pub fn with_id(id: i64, model_id: i64, fields: Vec<String>, tags: Vec<String>) -> Self {
        reserve_id(id);
        let first = fields.first().map(String::as_str).unwrap_or_default();
        Self {
            id,
            model_id,
            sort_field: first.to_string(),
            checksum: field_checksum(first),
            fields,
            tags,
            modified: Utc::now(),
        }
    }

    /// Note id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Id of the model this note instantiates.
    pub fn model_id(&self) -> i64 {
        self.model_id
    }

    /// Field values in model order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Tags attached to the note.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Time the note was created.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// The first field, verbatim.
    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    /// Checksum of the first field, see [`field_checksum`].
    pub fn checksum(&self) -> i64 {
        self.checksum
    }

    /// External identifier: the id in lowercase hexadecimal.
    pub fn guid(&self) -> String {
        format!("{:x}", self.id)
    }

    /// The `flds` column value.
    pub fn encoded_fields(&self) -> String {
        join_fields(&self.fields)
    }
}

/// Sum of the Unicode code points of `field`, modulo 65536.
pub fn field_checksum(field: &str) -> i64 {
    let sum: u64 = field.chars().map(|c| u64::from(u32::from(c))).sum();
    (sum % 65536) as i64
}

/// Join field values with [`FIELD_SEPARATOR`].
///
/// An empty list and a list holding one empty string both encode to `""`;
/// [`split_fields`] decodes that blob as the single empty field.
pub fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let mut joined = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.push_str(field.as_ref());
    }
    joined
}

/// Split a `flds` value back into field values.
///
/// Always returns at least one field, so `""` yields `[""]`.
pub fn split_fields(encoded: &str) -> Vec<String> {
    encoded.split(FIELD_SEPARATOR).map(str::to_string).collect()
}
