//! Configuration for reading a package.

use crate::path::Traversal;

/// Options applied to every operation on an [`Epub`](crate::Epub).
///
/// # Example
///
/// ```
/// use folio::{Options, Traversal};
///
/// let options = Options::new()
///     .with_image_root("/static")
///     .with_link_root("/read")
///     .with_traversal(Traversal::Clamp);
/// assert_eq!(options.image_root.as_deref(), Some("/static"));
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Prefix for rewritten embedded-resource references.
    pub image_root: Option<String>,
    /// Prefix for rewritten hyperlinks.
    pub link_root: Option<String>,
    /// How the rewriter treats `..` above the package root.
    pub traversal: Traversal,
    /// Strip scripts and styles and neutralize event handlers in chapters
    /// (default true).
    pub sanitize: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            image_root: None,
            link_root: None,
            traversal: Traversal::Preserve,
            sanitize: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_root(mut self, root: impl Into<String>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    pub fn with_link_root(mut self, root: impl Into<String>) -> Self {
        self.link_root = Some(root.into());
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }
}
