//! # folio
//!
//! A reader for EPUB packages that serves chapters ready for display.
//!
//! ## Features
//!
//! - Validates the package marker and loads container, descriptor, manifest,
//!   reading order and legacy (NCX) table of contents in one pass
//! - Canonical path resolution inside the package namespace
//! - Chapter rendering: body extraction, removal of scripts, styles and event
//!   handlers, and rewriting of image and link references to caller-chosen
//!   roots
//! - Extraction of selected or all members with in-place reference rewriting
//!
//! ## Quick Start
//!
//! ```no_run
//! use folio::{Epub, Options};
//!
//! let options = Options::new().with_image_root("/static").with_link_root("/read");
//! let epub = Epub::open_with("book.epub", options)?;
//!
//! println!("{:?}", epub.metadata().title());
//! for node in epub.toc() {
//!     println!("{} -> {}", node.name, node.file_name);
//! }
//! let first = epub.spine_chapter(0)?;
//! # Ok::<(), folio::Error>(())
//! ```
//!
//! ## Lower-level pieces
//!
//! [`path::resolve`] and [`rewrite::rewrite`] work on plain strings and a
//! [`PackageIndex`] and can be used without an archive:
//!
//! ```
//! use folio::{ManifestItem, PackageIndex};
//!
//! let index = PackageIndex::build(
//!     vec![ManifestItem::new("cover", "images/cover.png", "image/png")],
//!     "",
//! );
//! let html = folio::rewrite::rewrite(
//!     r#"<img src="images/cover.png">"#,
//!     "chapter1.xhtml",
//!     &index,
//!     Some("/static"),
//!     None,
//! );
//! assert_eq!(html, r#"<img src="/static/images/cover.png">"#);
//! ```

pub mod archive;
pub mod epub;
pub mod error;
pub mod options;
pub mod package;
pub mod path;
pub mod rewrite;
pub mod sanitize;
pub mod util;

pub use archive::PackageSource;
pub use epub::Epub;
pub use error::{Error, Result};
pub use options::Options;
pub use package::index::{ManifestEntry, ManifestItem, MediaTypeFilter, PackageIndex};
pub use package::metadata::{Metadata, MetadataValue};
pub use package::toc::TocNode;
pub use package::{PackageStructure, SpineItem};
pub use path::Traversal;
