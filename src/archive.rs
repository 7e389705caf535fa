//! Access to the ZIP container holding a package.
//!
//! A [`PackageSource`] says where the package bytes live; every operation that
//! needs archive content calls [`PackageSource::open`] and drops the returned
//! [`PackageArchive`] before returning, so no handle outlives a call.

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};

/// Characters a packager escapes when storing member names in URL form.
const MEMBER_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Largest up-front buffer reserved from a member's declared size.
const MAX_SIZE_HINT: u64 = 1 << 20;

/// Where a package's bytes come from.
#[derive(Debug, Clone)]
pub enum PackageSource {
    /// A file on disk, reopened for each operation.
    File(PathBuf),
    /// An in-memory copy of the whole package.
    Memory(Arc<[u8]>),
}

impl PackageSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        PackageSource::File(path.as_ref().to_path_buf())
    }

    pub fn memory(data: impl Into<Arc<[u8]>>) -> Self {
        PackageSource::Memory(data.into())
    }

    /// Open the archive. The handle is released when the result is dropped.
    pub fn open(&self) -> Result<PackageArchive<SourceReader>> {
        let reader = match self {
            PackageSource::File(path) => SourceReader::File(BufReader::new(File::open(path)?)),
            PackageSource::Memory(data) => SourceReader::Memory(Cursor::new(Arc::clone(data))),
        };
        PackageArchive::new(reader)
    }
}

/// `Read + Seek` stream over a [`PackageSource`], handed to `zip::ZipArchive`.
pub enum SourceReader {
    File(BufReader<File>),
    Memory(Cursor<Arc<[u8]>>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::File(file) => file.read(buf),
            SourceReader::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SourceReader::File(file) => file.seek(pos),
            SourceReader::Memory(cursor) => cursor.seek(pos),
        }
    }
}

/// An open package archive.
pub struct PackageArchive<R> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> PackageArchive<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(reader).map_err(|e| zip_error(e, ""))?,
        })
    }

    /// Whether a member exists under exactly this name.
    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Names of all members, in central directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.is_empty()
    }

    /// The stored member name for `name`.
    ///
    /// Tries the exact name, then the percent-decoded name (raw hrefs passed
    /// by callers), then the percent-encoded name (packages that store
    /// members under their escaped URL form, e.g. `My%20File.png`).
    pub fn member_name(&self, name: &str) -> Option<String> {
        if self.contains(name) {
            return Some(name.to_string());
        }

        let decoded = percent_decode_str(name).decode_utf8_lossy();
        if decoded != name && self.contains(&decoded) {
            return Some(decoded.into_owned());
        }

        let encoded = utf8_percent_encode(name, MEMBER_NAME).to_string();
        if encoded != name && self.contains(&encoded) {
            debug!("member {name} stored as {encoded}");
            return Some(encoded);
        }
        None
    }

    /// Read a whole member, looked up with [`member_name`](Self::member_name).
    pub fn read_all(&mut self, name: &str) -> Result<Vec<u8>> {
        let name = self
            .member_name(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;

        let mut file = self.zip.by_name(&name).map_err(|e| zip_error(e, &name))?;
        let mut contents = Vec::with_capacity(size_hint(file.size()));
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Materialize the named members under `dest`, returning the paths
    /// written. Members whose names would land outside `dest` are skipped.
    pub fn extract_selected<S: AsRef<str>>(&mut self, dest: &Path, names: &[S]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dest)?;
        let mut written = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            let mut file = self.zip.by_name(name).map_err(|e| zip_error(e, name))?;
            let Some(relative) = file.enclosed_name() else {
                warn!("skipping archive member with unsafe name: {name}");
                continue;
            };
            let target = dest.join(relative);

            if file.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut file, &mut out)?;
            debug!("extracted {name} -> {}", target.display());
            written.push(target);
        }

        Ok(written)
    }

    /// Materialize every member under `dest`, with the same skipping rules
    /// as [`extract_selected`](Self::extract_selected).
    pub fn extract_all(&mut self, dest: &Path) -> Result<Vec<PathBuf>> {
        let names: Vec<String> = self.names().map(str::to_string).collect();
        self.extract_selected(dest, &names)
    }
}

/// Buffer reservation for a member declaring `size` bytes. The declared size
/// comes from the archive and is not trusted beyond [`MAX_SIZE_HINT`].
fn size_hint(size: u64) -> usize {
    usize::try_from(size.min(MAX_SIZE_HINT)).unwrap_or(0)
}

/// Map zip failures onto the crate's error kinds.
fn zip_error(error: ZipError, name: &str) -> Error {
    match error {
        ZipError::FileNotFound => Error::EntryNotFound(name.to_string()),
        ZipError::Io(e) => Error::Io(e),
        other => Error::Zip(other),
    }
}
