//! Path algebra for the package's internal namespace.
//!
//! Every lookup inside a package is keyed by a *canonical path*: a
//! forward-slash delimited, package-root-relative string with no `.` or empty
//! segments and with `..` folded into its preceding segment wherever one
//! exists. Nothing here touches the archive; it is pure string work.
//!
//! ```
//! use folio::path::resolve;
//!
//! assert_eq!(resolve("a/b/c.xhtml", "../img/x.png", true), "a/img/x.png");
//! assert_eq!(resolve("OEBPS", "Text/ch1.xhtml", false), "OEBPS/Text/ch1.xhtml");
//! // Walking above the root keeps the `..` instead of clamping.
//! assert_eq!(resolve("", "a/../../b", false), "../b");
//! ```

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// What to do with a `..` segment that has nothing left to pop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, clap::ValueEnum))]
pub enum Traversal {
    /// Keep the `..` segment in the result (`"a/../../b"` -> `"../b"`).
    #[default]
    Preserve,
    /// Drop the `..` segment, pinning the path at the package root.
    Clamp,
    /// Refuse the path altogether.
    Reject,
}

/// Resolve `reference` against `base` into a canonical path.
///
/// When `base_is_document` is set, `base` names a file and only its directory
/// takes part in the resolution. Backslashes are treated as separators.
/// Traversal above the package root is preserved; see [`resolve_with`] for the
/// other modes.
pub fn resolve(base: &str, reference: &str, base_is_document: bool) -> String {
    resolve_with(base, reference, base_is_document, Traversal::Preserve).unwrap_or_default()
}

/// Resolve `reference` against `base`, handling over-popped `..` segments
/// according to `traversal`.
///
/// Returns `None` only for [`Traversal::Reject`] when the reference climbs out
/// of the package root.
pub fn resolve_with(
    base: &str,
    reference: &str,
    base_is_document: bool,
    traversal: Traversal,
) -> Option<String> {
    let base = base.replace('\\', "/");
    let reference = reference.replace('\\', "/");
    let base_dir = if base_is_document {
        parent_dir(&base)
    } else {
        base.as_str()
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ => match traversal {
                    Traversal::Preserve => stack.push(".."),
                    Traversal::Clamp => {}
                    Traversal::Reject => return None,
                },
            },
            other => stack.push(other),
        }
    }

    Some(stack.join("/"))
}

/// Directory part of a path: everything before the last `/`, or `""`.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Split `chapter.xhtml#note-1` into `("chapter.xhtml", Some("note-1"))`.
///
/// Splits on the first `#`; an empty fragment is still reported as present.
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    }
}

/// Decode `%XX` escapes. Invalid UTF-8 after decoding is replaced lossily.
pub fn percent_decode(value: &str) -> Cow<'_, str> {
    if !value.contains('%') {
        return Cow::Borrowed(value);
    }
    percent_decode_str(value).decode_utf8_lossy()
}

/// True when a canonical path still starts with a `..` segment.
pub fn escapes_root(canonical: &str) -> bool {
    canonical == ".." || canonical.starts_with("../")
}
