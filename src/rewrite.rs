//! Rewriting of resource and hyperlink references inside document markup.
//!
//! The markup is scanned as text, not parsed: only the values of matched
//! `src` / `xlink:href` / `href` attributes change, and only when the
//! reference resolves to a member of the manifest. Everything else, including
//! whitespace, comments and malformed tags, is passed through byte for byte.
//!
//! Values are matched with double quotes, single quotes or no quotes. An
//! attribute value that itself contains the other quote character or `>`
//! unquoted may be cut short; that is an accepted limit of text scanning.

use std::borrow::Cow;
use std::sync::LazyLock;

use log::debug;
use regex_lite::{Captures, Regex};

use crate::package::index::PackageIndex;
use crate::path::{Traversal, percent_decode, resolve_with, split_fragment};

/// `src="..."` and `xlink:href="..."`: embedded resources (images, media).
static RESOURCE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s(?:src|xlink:href)\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// `href="..."`: hyperlinks and stylesheet links. `xlink:href` never matches
/// because the name must follow whitespace.
static LINK_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\shref\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Rewrite the references in `markup`, a document stored at `document_href`.
///
/// Embedded resources that exist in `index` become `image_root/<canonical>`
/// (or just `<canonical>` without a root); hyperlinks likewise with
/// `link_root`, keeping their fragment.
pub fn rewrite(
    markup: &str,
    document_href: &str,
    index: &PackageIndex,
    image_root: Option<&str>,
    link_root: Option<&str>,
) -> String {
    let mut rewriter = Rewriter::new(index);
    rewriter.image_root = image_root;
    rewriter.link_root = link_root;
    rewriter.rewrite(markup, document_href)
}

/// Configured reference rewriter over one package index.
#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'a> {
    index: &'a PackageIndex,
    image_root: Option<&'a str>,
    link_root: Option<&'a str>,
    traversal: Traversal,
}

impl<'a> Rewriter<'a> {
    pub fn new(index: &'a PackageIndex) -> Self {
        Self {
            index,
            image_root: None,
            link_root: None,
            traversal: Traversal::Preserve,
        }
    }

    pub fn with_image_root(mut self, root: Option<&'a str>) -> Self {
        self.image_root = root;
        self
    }

    pub fn with_link_root(mut self, root: Option<&'a str>) -> Self {
        self.link_root = root;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Run both passes. Each pass resolves against `document_href`.
    pub fn rewrite(&self, markup: &str, document_href: &str) -> String {
        let resources = self.rewrite_resources(markup, document_href);
        self.rewrite_links(&resources, document_href).into_owned()
    }

    /// Embedded-resource pass only.
    pub fn rewrite_resources<'t>(&self, markup: &'t str, document_href: &str) -> Cow<'t, str> {
        let mut rewritten = 0usize;
        let out = replace_values(&RESOURCE_ATTR_RE, markup, |raw| {
            let target = self.resource_target(raw, document_href);
            rewritten += usize::from(target.is_some());
            target
        });
        debug!("{document_href}: rewrote {rewritten} resource reference(s)");
        out
    }

    /// Hyperlink pass only.
    pub fn rewrite_links<'t>(&self, markup: &'t str, document_href: &str) -> Cow<'t, str> {
        let mut rewritten = 0usize;
        let out = replace_values(&LINK_ATTR_RE, markup, |raw| {
            let target = self.link_target(raw, document_href);
            rewritten += usize::from(target.is_some());
            target
        });
        debug!("{document_href}: rewrote {rewritten} link reference(s)");
        out
    }

    fn resource_target(&self, raw: &str, document_href: &str) -> Option<String> {
        if is_foreign(raw, self.image_root) {
            return None;
        }
        let resolved = resolve_with(document_href, &percent_decode(raw), true, self.traversal)?;
        self.index.lookup_by_href(&resolved)?;
        Some(with_root(self.image_root, &resolved))
    }

    fn link_target(&self, raw: &str, document_href: &str) -> Option<String> {
        if is_foreign(raw, self.link_root) {
            return None;
        }
        let resolved = resolve_with(document_href, &percent_decode(raw), true, self.traversal)?;
        let (path, resolved_fragment) = split_fragment(&resolved);
        self.index.lookup_by_href(path)?;

        let mut target = with_root(self.link_root, path);
        if let Some(fragment) = split_fragment(raw).1.or(resolved_fragment) {
            target.push('#');
            target.push_str(fragment);
        }
        Some(target)
    }
}

/// Replace the captured value of every match for which `target` returns a
/// new value, keeping the attribute name, `=` and quoting as written.
fn replace_values<'t>(
    re: &Regex,
    markup: &'t str,
    mut target: impl FnMut(&str) -> Option<String>,
) -> Cow<'t, str> {
    re.replace_all(markup, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let prefix = &caps[1];
        let (quote, mut value) = match (caps.get(2), caps.get(3), caps.get(4)) {
            (Some(v), _, _) => ("\"", v.as_str()),
            (_, Some(v), _) => ("'", v.as_str()),
            (_, _, Some(v)) => ("", v.as_str()),
            _ => return whole.to_string(),
        };

        // `<img src=a.png/>`: the slash closes the tag, it is not part of the value.
        let mut suffix = "";
        let end = caps.get(0).map_or(0, |m| m.end());
        if quote.is_empty() && value.ends_with('/') && markup[end..].starts_with('>') {
            value = &value[..value.len() - 1];
            suffix = "/";
        }

        match target(value) {
            Some(new_value) => format!("{prefix}{quote}{new_value}{quote}{suffix}"),
            None => whole.to_string(),
        }
    })
}

/// References that are never rewritten: empty, fragment-only, carrying a
/// URL scheme, or already under `root`.
fn is_foreign(raw: &str, root: Option<&str>) -> bool {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || has_scheme(raw) {
        return true;
    }
    root.map(|r| r.trim_end_matches('/'))
        .filter(|r| !r.is_empty())
        .is_some_and(|r| raw.strip_prefix(r).is_some_and(|rest| rest.starts_with('/')))
}

/// `http:`, `mailto:`, `data:`... A scheme starts with a letter and runs
/// until the first `:` before any `/`, `?` or `#`.
fn has_scheme(value: &str) -> bool {
    let Some(colon) = value.find(':') else {
        return false;
    };
    let scheme = &value[..colon];
    scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn with_root(root: Option<&str>, path: &str) -> String {
    match root {
        Some(root) => format!("{}/{}", root.trim_end_matches('/'), path),
        None => path.to_string(),
    }
}
