//! Error types for ankit-pack.

use thiserror::Error;

/// Result type for ankit-pack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a package.
#[derive(Debug, Error)]
pub enum Error {
    /// The SQLite engine failed while performing `step`.
    #[error("failed to {step}: {source}")]
    Sqlite {
        /// The step that failed, e.g. "insert note".
        step: &'static str,
        /// Underlying engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// A JSON configuration blob could not be encoded or decoded.
    #[error("failed to {step}: {source}")]
    Json {
        /// The step that failed, e.g. "encode models".
        step: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The collection row (`col.id = 1`) does not exist.
    #[error("collection row is missing; add a model before adding decks")]
    MissingCollection,

    /// Model not found in a package definition.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Deck not found in a package definition.
    #[error("deck not found: {0}")]
    DeckNotFound(String),

    /// Field not found in model.
    #[error("field '{field}' not found in model '{model}'")]
    FieldNotFound {
        /// Model name.
        model: String,
        /// Field name.
        field: String,
    },

    /// Media file could not be read.
    #[error("media file not found: {0}")]
    MediaNotFound(String),
}

/// Attach the name of the failing step to engine and JSON errors.
pub(crate) trait Context<T> {
    fn context(self, step: &'static str) -> Result<T>;
}

impl<T> Context<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, step: &'static str) -> Result<T> {
        self.map_err(|source| Error::Sqlite { step, source })
    }
}

impl<T> Context<T> for std::result::Result<T, serde_json::Error> {
    fn context(self, step: &'static str) -> Result<T> {
        self.map_err(|source| Error::Json { step, source })
    }
}
