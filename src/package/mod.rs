//! Package structure: container pointer, descriptor, manifest, reading order
//! and table of contents, loaded in one pass.

pub mod index;
pub mod metadata;
pub mod parser;
pub mod toc;

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::archive::PackageArchive;
use crate::error::{Error, Result};
use crate::path::parent_dir;
use crate::util::decode_markup;

use index::{MediaTypeFilter, NCX_MEDIA_TYPE, ManifestEntry, PackageIndex};
use metadata::Metadata;
use parser::{OpfData, parse_container_xml, parse_ncx, parse_opf};
use toc::TocNode;

/// Fixed location of the container pointer.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
/// Fixed name of the validity marker.
pub const MIMETYPE_PATH: &str = "mimetype";
/// Registered media type an EPUB's validity marker must carry.
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// An item in the reading order (spine).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct SpineItem {
    /// Manifest id; not guaranteed to exist in the manifest.
    pub idref: String,
    /// False for `linear="no"` items (notes, pop-ups).
    pub linear: bool,
}

/// The parsed structure of one package. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct PackageStructure {
    /// Archive path of the package descriptor (OPF).
    pub descriptor_path: String,
    /// Directory holding the descriptor; `""` at the package root.
    pub base_dir: String,
    pub metadata: Metadata,
    pub index: PackageIndex,
    pub reading_order: Vec<SpineItem>,
    /// Empty when the package has no legacy navigation document.
    pub toc: Vec<TocNode>,
    /// Manifest id of the navigation document used for `toc`.
    pub toc_id: Option<String>,
    /// Manifest id of the cover image, when one is declared.
    pub cover_id: Option<String>,
}

impl PackageStructure {
    /// Manifest entry by id, or `EntryNotFound`.
    pub fn entry(&self, id: &str) -> Result<&ManifestEntry> {
        self.index
            .lookup_by_id(id)
            .ok_or_else(|| Error::EntryNotFound(format!("manifest id {id}")))
    }

    /// Resolve the reading-order item at `position` to its manifest entry.
    pub fn spine_entry(&self, position: usize) -> Result<&ManifestEntry> {
        let item = self
            .reading_order
            .get(position)
            .ok_or_else(|| Error::EntryNotFound(format!("spine position {position}")))?;
        self.entry(&item.idref)
    }

    /// Every reading-order item resolved lazily; dangling ids surface as
    /// `EntryNotFound` at their position.
    pub fn spine_entries(&self) -> impl Iterator<Item = Result<&ManifestEntry>> {
        self.reading_order.iter().map(|item| self.entry(&item.idref))
    }

    /// Fail on the first reading-order id missing from the manifest.
    pub fn validate_reading_order(&self) -> Result<()> {
        self.spine_entries().try_for_each(|entry| entry.map(|_| ()))
    }

    pub fn reading_order_ids(&self) -> impl Iterator<Item = &str> {
        self.reading_order.iter().map(|item| item.idref.as_str())
    }

    pub fn cover(&self) -> Option<&ManifestEntry> {
        self.cover_id.as_deref().and_then(|id| self.index.lookup_by_id(id))
    }
}

/// Check the package's validity marker.
///
/// The `mimetype` member, trimmed and lowercased, must equal
/// `application/epub+zip`.
pub fn file_check<R: Read + Seek>(archive: &mut PackageArchive<R>) -> Result<()> {
    let marker = match archive.read_all(MIMETYPE_PATH) {
        Ok(marker) => marker,
        Err(Error::EntryNotFound(_)) => {
            return Err(Error::PackageInvalid("missing mimetype entry".into()));
        }
        Err(e) => return Err(e),
    };

    let marker = String::from_utf8_lossy(&marker).trim().to_ascii_lowercase();
    if marker != EPUB_MIMETYPE {
        return Err(Error::PackageInvalid(format!("unexpected mimetype {marker:?}")));
    }
    Ok(())
}

/// Load the package structure from an open archive.
///
/// Either every part loads or an error is returned; nothing partial escapes.
pub fn load<R: Read + Seek>(archive: &mut PackageArchive<R>) -> Result<PackageStructure> {
    // 1. Container pointer
    let container = archive.read_all(CONTAINER_PATH).map_err(|e| match e {
        Error::EntryNotFound(_) => Error::MalformedContainer(format!("missing {CONTAINER_PATH}")),
        other => other,
    })?;
    let descriptor_path = parse_container_xml(&container)?;

    // 2. Base directory
    let base_dir = parent_dir(&descriptor_path).to_string();
    debug!("package descriptor at {descriptor_path:?}, base dir {base_dir:?}");

    // 3-6. Descriptor: metadata, manifest, reading order
    let descriptor = archive.read_all(&descriptor_path)?;
    let OpfData {
        metadata,
        manifest,
        spine,
        toc_id,
        cover_meta_id,
    } = parse_opf(&decode_markup(&descriptor))?;

    let index = PackageIndex::build(manifest, &base_dir);

    let cover_id = index
        .iter()
        .find(|entry| entry.has_property("cover-image"))
        .map(|entry| entry.id.clone())
        .or_else(|| cover_meta_id.filter(|id| index.lookup_by_id(id).is_some()));

    // 7. Legacy navigation document
    let ncx = toc_id
        .as_deref()
        .and_then(|id| index.lookup_by_id(id))
        .filter(|entry| entry.media_type.eq_ignore_ascii_case(NCX_MEDIA_TYPE))
        .or_else(|| {
            index
                .filter_by_media_type(&MediaTypeFilter::literal(NCX_MEDIA_TYPE))
                .into_iter()
                .next()
        });

    let (toc, toc_id) = match ncx {
        Some(entry) => {
            let bytes = archive.read_all(&entry.href)?;
            let toc = parse_ncx(&decode_markup(&bytes), &base_dir)?;
            for node in toc.iter().flat_map(TocNode::walk) {
                if index.lookup_by_href(&node.file_name).is_none() {
                    warn!("table of contents entry {:?} points outside the manifest: {}", node.name, node.file_name);
                }
            }
            (toc, Some(entry.id.clone()))
        }
        None => {
            debug!("no legacy navigation document declared");
            (Vec::new(), None)
        }
    };

    Ok(PackageStructure {
        descriptor_path,
        base_dir,
        metadata,
        index,
        reading_order: spine,
        toc,
        toc_id,
        cover_id,
    })
}
