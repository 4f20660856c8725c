//! Media files bundled into a package.
//!
//! Media is kept by filename. Adding a file under an existing name replaces
//! it; content hashes identify files but are never used to deduplicate.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use mime_guess::Mime;
use mime_guess::mime;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Characters replaced by `_` in media filenames.
pub const INVALID_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A named media file with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    filename: String,
    data: Vec<u8>,
    hash: String,
}

impl MediaFile {
    /// Create a media file, sanitizing the name.
    pub fn new(filename: &str, data: Vec<u8>) -> Self {
        let hash = media_hash(&data);
        Self {
            filename: sanitize_filename(filename),
            data,
            hash,
        }
    }

    /// Read a media file from disk, named after the path's final component.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::MediaNotFound(path.display().to_string()),
            _ => Error::Io(err),
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(&filename, data))
    }

    /// Read a media file from `reader`.
    pub fn from_reader(filename: &str, mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::new(filename, data))
    }

    /// Filename inside the package manifest.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Hex-encoded SHA-1 of the bytes.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// MIME type guessed from the extension, `application/octet-stream` if unknown.
    pub fn mime_type(&self) -> Mime {
        mime_guess::from_path(&self.filename).first_or_octet_stream()
    }

    /// Whether the extension denotes an image.
    pub fn is_image(&self) -> bool {
        self.mime_type().type_() == mime::IMAGE
    }

    /// Whether the extension denotes audio.
    pub fn is_audio(&self) -> bool {
        self.mime_type().type_() == mime::AUDIO
    }

    /// Whether the extension denotes video.
    pub fn is_video(&self) -> bool {
        self.mime_type().type_() == mime::VIDEO
    }
}

/// Replace characters that are invalid in media filenames with `_`.
///
/// # Example
///
/// ```
/// use ankit_pack::sanitize_filename;
///
/// assert_eq!(sanitize_filename("b:c.png"), "b_c.png");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Hex-encoded SHA-1 of `data`.
pub fn media_hash(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}

/// The media table of a package, enumerated in filename order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPackager {
    files: BTreeMap<String, Vec<u8>>,
}

impl MediaPackager {
    /// An empty media table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `data` under `filename` exactly as given.
    ///
    /// The name is not sanitized; use [`add_file`](Self::add_file) with a
    /// [`MediaFile`] for that.
    pub fn add(&mut self, filename: impl Into<String>, data: Vec<u8>) {
        self.files.insert(filename.into(), data);
    }

    /// Insert a media file under its (already sanitized) name.
    pub fn add_file(&mut self, file: MediaFile) {
        self.files.insert(file.filename, file.data);
    }

    /// Read and add a file from disk under its sanitized base name.
    pub fn add_from_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.add_file(MediaFile::from_path(path)?);
        Ok(())
    }

    /// Read and add a file from `reader` under the sanitized `filename`.
    pub fn add_from_reader(&mut self, filename: &str, reader: impl Read) -> Result<()> {
        self.add_file(MediaFile::from_reader(filename, reader)?);
        Ok(())
    }

    /// Remove a file; absent names are ignored.
    pub fn remove(&mut self, filename: &str) {
        self.files.remove(filename);
    }

    /// Remove every file.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// All files, in stored-name order.
    ///
    /// The returned files carry sanitized names even when the entry was
    /// stored raw through [`add`](Self::add).
    pub fn list(&self) -> Vec<MediaFile> {
        self.files
            .iter()
            .map(|(name, data)| MediaFile::new(name, data.clone()))
            .collect()
    }

    /// One file by its stored name, returned under its sanitized name.
    pub fn get(&self, filename: &str) -> Option<MediaFile> {
        self.files
            .get(filename)
            .map(|data| MediaFile::new(filename, data.clone()))
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there are no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|data| data.len() as u64).sum()
    }

    /// Iterate `(filename, bytes)` in filename order without copying.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// A new table with `self`'s files overlaid by `other`'s.
    pub fn merged_with(&self, other: &MediaPackager) -> MediaPackager {
        let mut files = self.files.clone();
        files.extend(
            other
                .files
                .iter()
                .map(|(name, data)| (name.clone(), data.clone())),
        );
        MediaPackager { files }
    }
}
