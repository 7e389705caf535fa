//! The [`Epub`] handle: a loaded package plus the operations served from it.
//!
//! The handle owns only the [`PackageSource`] and the immutable
//! [`PackageStructure`]. Every operation that needs archive content opens the
//! archive, reads, and lets the archive drop before returning.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::archive::PackageSource;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::package::index::{ManifestEntry, PackageIndex};
use crate::package::metadata::Metadata;
use crate::package::toc::TocNode;
use crate::package::{self, PackageStructure, SpineItem};
use crate::path::escapes_root;
use crate::rewrite::Rewriter;
use crate::sanitize;
use crate::util::{decode_markup, decode_markup_with_encoding, encode_like};

/// An opened EPUB package.
///
/// # Example
///
/// ```no_run
/// use folio::{Epub, Options};
///
/// let epub = Epub::open_with("book.epub", Options::new().with_image_root("/static"))?;
/// for entry in epub.spine_entries() {
///     let entry = entry?;
///     let html = epub.chapter(&entry.id)?;
///     println!("{}: {} bytes", entry.href, html.len());
/// }
/// # Ok::<(), folio::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Epub {
    source: PackageSource,
    options: Options,
    structure: PackageStructure,
}

impl Epub {
    /// Open a package file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Options::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        Self::from_source(PackageSource::file(path), options)
    }

    /// Open a package held in memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::from_bytes_with(data, Options::default())
    }

    pub fn from_bytes_with(data: impl Into<Vec<u8>>, options: Options) -> Result<Self> {
        let data: Vec<u8> = data.into();
        Self::from_source(PackageSource::memory(data), options)
    }

    /// Validate the marker, then load the structure.
    pub fn from_source(source: PackageSource, options: Options) -> Result<Self> {
        let structure = {
            let mut archive = source.open()?;
            package::file_check(&mut archive)?;
            package::load(&mut archive)?
        };

        info!(
            "opened package {:?}: {} manifest entries, {} spine items, {} toc entries",
            structure.metadata.title().unwrap_or_default(),
            structure.index.len(),
            structure.reading_order.len(),
            structure.toc.len()
        );

        Ok(Self {
            source,
            options,
            structure,
        })
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn structure(&self) -> &PackageStructure {
        &self.structure
    }

    pub fn metadata(&self) -> &Metadata {
        &self.structure.metadata
    }

    pub fn manifest(&self) -> &PackageIndex {
        &self.structure.index
    }

    pub fn spine(&self) -> &[SpineItem] {
        &self.structure.reading_order
    }

    pub fn toc(&self) -> &[TocNode] {
        &self.structure.toc
    }

    pub fn cover(&self) -> Option<&ManifestEntry> {
        self.structure.cover()
    }

    /// Manifest entry by id, or `EntryNotFound`.
    pub fn manifest_entry(&self, id: &str) -> Result<&ManifestEntry> {
        self.structure.entry(id)
    }

    /// Reading order resolved against the manifest, one result per item.
    pub fn spine_entries(&self) -> impl Iterator<Item = Result<&ManifestEntry>> {
        self.structure.spine_entries()
    }

    /// Raw bytes of any manifest entry.
    pub fn read_file(&self, id: &str) -> Result<Vec<u8>> {
        let entry = self.structure.entry(id)?;
        self.read_member(&entry.href)
    }

    /// Raw bytes of an image entry.
    pub fn read_image(&self, id: &str) -> Result<Vec<u8>> {
        let entry = self.structure.entry(id)?;
        if !entry.is_image() {
            return Err(unsupported(entry, "an image/* media type"));
        }
        self.read_member(&entry.href)
    }

    /// A content document prepared for display: body only, active content
    /// removed (unless disabled in [`Options`]), references rewritten.
    pub fn chapter(&self, id: &str) -> Result<String> {
        let entry = self.structure.entry(id)?;
        self.render(entry)
    }

    /// [`chapter`](Self::chapter) for the reading-order item at `position`.
    pub fn spine_chapter(&self, position: usize) -> Result<String> {
        let entry = self.structure.spine_entry(position)?;
        self.render(entry)
    }

    /// Extract the given manifest entries under `dest`, rewriting extracted
    /// documents in place. Returns the files written.
    pub fn extract<S: AsRef<str>>(&self, dest: impl AsRef<Path>, ids: &[S]) -> Result<Vec<PathBuf>> {
        let dest = dest.as_ref();
        let entries = ids
            .iter()
            .map(|id| self.structure.entry(id.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut archive = self.source.open()?;
        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            if escapes_root(&entry.href) {
                warn!("skipping {}: href {} leaves the package root", entry.id, entry.href);
                continue;
            }
            let member = archive
                .member_name(&entry.href)
                .ok_or_else(|| Error::EntryNotFound(entry.href.clone()))?;
            for path in archive.extract_selected(dest, &[member])? {
                if entry.is_document() {
                    self.rewrite_in_place(&path, &entry.href)?;
                }
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Extract every archive member under `dest`, then rewrite each extracted
    /// document in place. Returns the files written.
    pub fn extract_all(&self, dest: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dest = dest.as_ref();
        let written = self.source.open()?.extract_all(dest)?;

        for entry in self.structure.index.iter().filter(|e| e.is_document()) {
            if escapes_root(&entry.href) {
                warn!("not rewriting {}: href {} leaves the package root", entry.id, entry.href);
                continue;
            }
            let path = dest.join(&entry.href);
            if path.is_file() {
                self.rewrite_in_place(&path, &entry.href)?;
            } else {
                debug!("manifest document {} was not extracted", entry.href);
            }
        }
        Ok(written)
    }

    fn render(&self, entry: &ManifestEntry) -> Result<String> {
        if !entry.is_document() {
            return Err(unsupported(entry, "an XHTML or HTML document"));
        }
        let bytes = self.read_member(&entry.href)?;
        let body = sanitize::prepare(&decode_markup(&bytes), self.options.sanitize);
        Ok(self.rewriter().rewrite(&body, &entry.href))
    }

    /// Rewrite an extracted document, writing it back in its own encoding.
    fn rewrite_in_place(&self, path: &Path, href: &str) -> Result<()> {
        let bytes = fs::read(path)?;
        let (text, encoding) = decode_markup_with_encoding(&bytes);
        let rewritten = self.rewriter().rewrite(&text, href);
        if rewritten == text {
            return Ok(());
        }

        match encode_like(&rewritten, encoding, &bytes) {
            Some(out) => {
                fs::write(path, out)?;
                debug!("rewrote references in {} ({})", path.display(), encoding.name());
            }
            None => warn!(
                "not rewriting {}: cannot write {} back",
                path.display(),
                encoding.name()
            ),
        }
        Ok(())
    }

    fn rewriter(&self) -> Rewriter<'_> {
        Rewriter::new(&self.structure.index)
            .with_image_root(self.options.image_root.as_deref())
            .with_link_root(self.options.link_root.as_deref())
            .with_traversal(self.options.traversal)
    }

    fn read_member(&self, name: &str) -> Result<Vec<u8>> {
        self.source.open()?.read_all(name)
    }
}

fn unsupported(entry: &ManifestEntry, expected: &'static str) -> Error {
    Error::UnsupportedMediaType {
        id: entry.id.clone(),
        media_type: entry.media_type.clone(),
        expected,
    }
}
