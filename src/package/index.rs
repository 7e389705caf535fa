//! Manifest index: every declared package member, by id and by location.

use std::collections::HashMap;

use regex_lite::Regex;

use crate::error::Result;
use crate::path::{percent_decode, resolve};

/// Media type of XHTML content documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
/// Media type of legacy HTML content documents.
pub const HTML_MEDIA_TYPE: &str = "text/html";
/// Media type of the legacy navigation document (NCX).
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// A manifest item as declared by the descriptor, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// `href` exactly as written, possibly percent-encoded and relative.
    pub href: String,
    pub media_type: String,
    /// Space-separated `properties` attribute, split.
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn new(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }
}

/// A resolved manifest entry. `href` is a canonical path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestEntry {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// Structured document content (XHTML or HTML).
    pub fn is_document(&self) -> bool {
        is_document_media_type(&self.media_type)
    }

    pub fn is_image(&self) -> bool {
        self.media_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}

pub fn is_document_media_type(media_type: &str) -> bool {
    media_type.eq_ignore_ascii_case(XHTML_MEDIA_TYPE) || media_type.eq_ignore_ascii_case(HTML_MEDIA_TYPE)
}

/// How [`PackageIndex::filter_by_media_type`] selects entries.
///
/// The mode is always explicit: a literal never gets interpreted as a
/// pattern just because it happens to contain regex metacharacters.
#[derive(Debug, Clone)]
pub enum MediaTypeFilter {
    /// Exact (ASCII case-insensitive) match, e.g. `image/png`.
    Literal(String),
    /// Regular expression matched anywhere in the media type, e.g. `^image/`.
    Pattern(Regex),
}

impl MediaTypeFilter {
    pub fn literal(media_type: impl Into<String>) -> Self {
        MediaTypeFilter::Literal(media_type.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(MediaTypeFilter::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, media_type: &str) -> bool {
        match self {
            MediaTypeFilter::Literal(literal) => literal.eq_ignore_ascii_case(media_type),
            MediaTypeFilter::Pattern(re) => re.is_match(media_type),
        }
    }
}

/// Manifest entries in declaration order, with constant-time lookup by id
/// and by canonical href.
///
/// Href collisions resolve last-wins: the later declaration owns the href slot.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    entries: Vec<ManifestEntry>,
    by_id: HashMap<String, usize>,
    by_href: HashMap<String, usize>,
}

impl PackageIndex {
    /// Build the index from declared items, resolving each href against
    /// `base_dir` (the directory holding the package descriptor).
    ///
    /// Items are stored as given; an empty id or href is not an error here.
    pub fn build(items: impl IntoIterator<Item = ManifestItem>, base_dir: &str) -> Self {
        let mut index = PackageIndex::default();
        for item in items {
            let href = resolve(base_dir, &percent_decode(&item.href), false);
            index.insert(ManifestEntry {
                id: item.id,
                href,
                media_type: item.media_type,
                properties: item.properties,
            });
        }
        index
    }

    fn insert(&mut self, entry: ManifestEntry) {
        let slot = match self.by_id.get(&entry.id) {
            Some(&slot) => {
                // Redeclared id: drop the stale href mapping before replacing.
                let old_href = &self.entries[slot].href;
                if self.by_href.get(old_href) == Some(&slot) {
                    self.by_href.remove(old_href);
                }
                self.entries[slot] = entry;
                slot
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        let entry = &self.entries[slot];
        self.by_id.insert(entry.id.clone(), slot);
        self.by_href.insert(entry.href.clone(), slot);
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&ManifestEntry> {
        self.by_id.get(id).map(|&slot| &self.entries[slot])
    }

    pub fn lookup_by_href(&self, href: &str) -> Option<&ManifestEntry> {
        self.by_href.get(href).map(|&slot| &self.entries[slot])
    }

    /// Entries whose media type satisfies `filter`, in manifest order.
    pub fn filter_by_media_type(&self, filter: &MediaTypeFilter) -> Vec<&ManifestEntry> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(&entry.media_type))
            .collect()
    }

    /// Distinct media types, in order of first declaration.
    pub fn media_types(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.media_type.as_str()) {
                seen.push(entry.media_type.as_str());
            }
        }
        seen
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a PackageIndex {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
