//! Preparation of chapter markup before references are rewritten.
//!
//! Line endings are normalized, the body content is cut out, and active
//! content is disabled: `<script>` and `<style>` blocks are removed and `on*`
//! event-handler attributes are renamed so browsers ignore them.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

/// Prefix given to neutralized event-handler attributes (`onclick` becomes
/// `data-inert-onclick`).
pub const INERT_PREFIX: &str = "data-inert-";

/// First body-open tag through the last body-close tag (greedy).
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());

/// A self-closed script, or a script through its close tag (or end of input
/// when it is never closed).
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*?/>|<script\b[^>]*>.*?(?:</script\s*>|$)").unwrap()
});

static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*?/>|<style\b[^>]*>.*?(?:</style\s*>|$)").unwrap()
});

/// An opening (or self-closing) tag.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[a-zA-Z][^>]*>").unwrap());

/// `on<event>=` inside a tag.
static HANDLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\s)(on[a-z]+\s*=)").unwrap());

/// Run the whole pipeline over a decoded document.
///
/// With `strip_active` false only line endings and body extraction apply.
pub fn prepare(markup: &str, strip_active: bool) -> String {
    let normalized = normalize_line_endings(markup);
    let body = extract_body(&normalized);
    if !strip_active {
        return body.to_string();
    }
    let stripped = strip_blocks(body);
    neutralize_handlers(&stripped).into_owned()
}

/// `\r\n` and lone `\r` become `\n`.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Content between the first `<body ...>` and the last `</body>`.
///
/// A document without body tags is returned whole. Fragment documents rely
/// on this.
pub fn extract_body(markup: &str) -> &str {
    BODY_RE
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map_or(markup, |m| m.as_str())
}

/// Remove `<script>` and `<style>` blocks including their content.
pub fn strip_blocks(markup: &str) -> Cow<'_, str> {
    match SCRIPT_RE.replace_all(markup, "") {
        Cow::Borrowed(unchanged) => STYLE_RE.replace_all(unchanged, ""),
        Cow::Owned(stripped) => Cow::Owned(STYLE_RE.replace_all(&stripped, "").into_owned()),
    }
}

/// Rename `on*` attributes inside tags by prefixing [`INERT_PREFIX`].
/// Text content is left alone.
pub fn neutralize_handlers(markup: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(markup, |caps: &Captures<'_>| {
        HANDLER_RE
            .replace_all(&caps[0], |h: &Captures<'_>| format!("{}{INERT_PREFIX}{}", &h[1], &h[2]))
            .into_owned()
    })
}
