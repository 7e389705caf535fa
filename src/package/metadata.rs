//! Descriptive metadata (Dublin Core and `<meta>` entries) of a package.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// A metadata field holds one string, or a list when it was declared more
/// than once (several `creator` elements, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize), serde(untagged))]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// The first (or only) value.
    pub fn first(&self) -> &str {
        match self {
            MetadataValue::Text(text) => text,
            MetadataValue::List(list) => list.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn to_vec(&self) -> Vec<&str> {
        match self {
            MetadataValue::Text(text) => vec![text.as_str()],
            MetadataValue::List(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// Mapping from metadata field name to its value(s).
///
/// Keys are the local element names (`title`, `creator`, `language`, ...),
/// the `name` of `<meta name=".." content=".."/>`, or the `property` of
/// EPUB 3 `<meta property="..">`. Empty elements map to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize), serde(transparent))]
pub struct Metadata {
    fields: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, turning the field into a list on repetition.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.fields.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(MetadataValue::Text(value));
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                if let MetadataValue::Text(first) = current {
                    *current = MetadataValue::List(vec![std::mem::take(first)]);
                }
                if let MetadataValue::List(list) = current {
                    list.push(value);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    /// First value of a field, if declared.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).map(MetadataValue::first)
    }

    /// All values of a field; empty when undeclared.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.get(key).map(MetadataValue::to_vec).unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.first("title")
    }

    pub fn creators(&self) -> Vec<&str> {
        self.all("creator")
    }

    pub fn language(&self) -> Option<&str> {
        self.first("language")
    }

    pub fn identifier(&self) -> Option<&str> {
        self.first("identifier")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
