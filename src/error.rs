//! Error types for folio operations.

use thiserror::Error;

/// Errors that can occur while opening a package or serving its content.
#[derive(Error, Debug)]
pub enum Error {
    /// Destination unwritable, or a read from the underlying file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive stream itself could not be read.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The `mimetype` marker is missing or does not name an EPUB.
    #[error("Invalid package: {0}")]
    PackageInvalid(String),

    /// `META-INF/container.xml` is missing or has no usable root entry.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// A manifest id, archive member or navigation target does not exist.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Entry {id} has media type {media_type}, expected {expected}")]
    UnsupportedMediaType {
        id: String,
        media_type: String,
        expected: &'static str,
    },

    #[error("Invalid media type pattern: {0}")]
    InvalidPattern(#[from] regex_lite::Error),
}

impl Error {
    /// True for the errors raised when something looked up does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
