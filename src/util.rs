//! Text decoding helpers.

use std::borrow::Cow;

use encoding_rs::Encoding;

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 first (a BOM is stripped automatically by encoding_rs)
/// 2. If malformed, the encoding named by `hint_encoding`
/// 3. Windows-1252, common in old ebooks
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    decode_text_with_encoding(bytes, hint_encoding).0
}

/// [`decode_text`], also returning the encoding that was actually used.
pub fn decode_text_with_encoding<'a>(
    bytes: &'a [u8],
    hint_encoding: Option<&str>,
) -> (Cow<'a, str>, &'static Encoding) {
    let (result, encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return (result, encoding);
    }

    if let Some(name) = hint_encoding
        && let Some(hinted) = Encoding::for_label(name.as_bytes())
    {
        let (result, encoding, _) = hinted.decode(bytes);
        return (result, encoding);
    }

    let (result, encoding, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (result, encoding)
}

/// Decode a markup document, using its `<?xml encoding="..."?>` declaration
/// as the fallback hint.
pub fn decode_markup(bytes: &[u8]) -> Cow<'_, str> {
    decode_markup_with_encoding(bytes).0
}

pub fn decode_markup_with_encoding(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    decode_text_with_encoding(bytes, declared_encoding(bytes))
}

/// Encode `text` back into the encoding `original` was decoded with,
/// keeping the byte-order mark `original` started with.
///
/// Returns `None` for encodings that cannot be written back (UTF-16 and the
/// replacement encoding encode as UTF-8 in `encoding_rs`).
pub fn encode_like(text: &str, encoding: &'static Encoding, original: &[u8]) -> Option<Vec<u8>> {
    if encoding.output_encoding() != encoding {
        return None;
    }

    let (encoded, _, _) = encoding.encode(text);
    let mut out = Vec::with_capacity(encoded.len() + 3);
    if let Some((bom_encoding, bom_len)) = Encoding::for_bom(original)
        && bom_encoding == encoding
    {
        out.extend_from_slice(&original[..bom_len]);
    }
    out.extend_from_slice(&encoded);
    Some(out)
}

/// Encoding name from an XML declaration at the start of `bytes`.
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(256)];
    let decl_end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..decl_end]).ok()?;
    if !decl.trim_start_matches('\u{feff}').trim_start().starts_with("<?xml") {
        return None;
    }

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|end| &value[..end])
}
