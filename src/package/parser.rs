//! Readers for the package's structured documents: `container.xml`, the OPF
//! package descriptor and the NCX navigation document.

use std::borrow::Cow;

use log::warn;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use super::SpineItem;
use super::index::ManifestItem;
use super::metadata::Metadata;
use super::toc::TocNode;
use crate::error::{Error, Result};
use crate::path::{percent_decode, resolve, split_fragment};

/// Everything read from the package descriptor in a single pass.
#[derive(Debug, Default)]
pub struct OpfData {
    pub metadata: Metadata,
    /// Manifest items in declaration order.
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    /// `toc` attribute of `<spine>` (id of the NCX item).
    pub toc_id: Option<String>,
    /// Id named by EPUB 2 `<meta name="cover" content="..."/>`.
    pub cover_meta_id: Option<String>,
}

/// Read `META-INF/container.xml` and return the `full-path` of the first
/// `rootfile`.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"rootfile" => {
                return find_attr(&e, b"full-path")
                    .filter(|path| !path.is_empty())
                    .ok_or_else(|| {
                        Error::MalformedContainer("rootfile has no full-path attribute".into())
                    });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::MalformedContainer(format!("unreadable container.xml: {e}")));
            }
            _ => {}
        }
    }

    Err(Error::MalformedContainer("no rootfile found in container.xml".into()))
}

/// Parse the OPF package document: metadata, manifest and spine.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);

    let mut opf = OpfData::default();
    let mut in_metadata = false;
    // Metadata field being collected: (key, value from attributes, text).
    let mut field: Option<(String, Option<String>, String)> = None;
    let mut depth_in_field = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if field.is_some() {
                    depth_in_field += 1;
                    continue;
                }

                match local {
                    b"metadata" => in_metadata = true,
                    b"dc-metadata" | b"x-metadata" => {}
                    _ if in_metadata => {
                        field = metadata_key(local, &e, &mut opf.cover_meta_id)
                            .map(|(key, value)| (key, value, String::new()));
                    }
                    b"item" => opf.manifest.extend(manifest_item(&e)),
                    b"itemref" => opf.spine.extend(spine_item(&e)),
                    b"spine" => opf.toc_id = find_attr(&e, b"toc"),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if field.is_some() {
                    continue;
                }

                match local {
                    _ if in_metadata => {
                        if let Some((key, value)) = metadata_key(local, &e, &mut opf.cover_meta_id) {
                            opf.metadata.push(key, value.unwrap_or_default());
                        }
                    }
                    b"item" => opf.manifest.extend(manifest_item(&e)),
                    b"itemref" => opf.spine.extend(spine_item(&e)),
                    b"spine" => opf.toc_id = find_attr(&e, b"toc"),
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, _, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, _, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some((_, _, text)) = field.as_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if field.is_some() {
                    if depth_in_field > 0 {
                        depth_in_field -= 1;
                    } else if let Some((key, value, text)) = field.take() {
                        let value = value.unwrap_or_else(|| text.trim().to_string());
                        opf.metadata.push(key, value);
                    }
                    continue;
                }
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(opf)
}

/// Parse an NCX document into a tree of [`TocNode`]s, resolving every
/// `content/@src` against `base_dir`.
pub fn parse_ncx(content: &str, base_dir: &str) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<NavPointState> = vec![NavPointState {
        node: TocNode::default(),
        src: None,
    }];
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    let node = TocNode {
                        id: find_attr(&e, b"id").unwrap_or_default(),
                        play_order: find_attr(&e, b"playOrder").and_then(|s| s.trim().parse().ok()),
                        ..Default::default()
                    };
                    stack.push(NavPointState { node, src: None });
                }
                b"text" => in_text = true,
                b"content" => set_src(&mut stack, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    set_src(&mut stack, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    state.node.name.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        state.node.name.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" if stack.len() > 1 => {
                    if let Some(NavPointState { mut node, src }) = stack.pop()
                        && let Some(parent) = stack.last_mut()
                    {
                        node.name = node.name.trim().to_string();
                        match src {
                            Some(src) => {
                                let resolved = resolve(base_dir, &percent_decode(&src), false);
                                let (file_name, fragment) = split_fragment(&resolved);
                                node.file_name = file_name.to_string();
                                node.fragment = fragment.map(str::to_string);
                                node.src = resolved;
                                parent.node.children.push(node);
                            }
                            None => {
                                warn!("navPoint {:?} has no content target; keeping its children", node.id);
                                parent.node.children.append(&mut node.children);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(stack.into_iter().next().map(|root| root.node.children).unwrap_or_default())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// A `navPoint` under construction; `src` is resolved once it closes.
struct NavPointState {
    node: TocNode,
    src: Option<String>,
}

fn set_src(stack: &mut [NavPointState], e: &BytesStart<'_>) {
    if let Some(state) = stack.last_mut()
        && let Some(src) = find_attr(e, b"src")
    {
        state.src = Some(src);
    }
}

/// Key and attribute-supplied value for a metadata child element.
///
/// Returns `None` for elements that carry nothing usable (a bare `<meta/>`).
fn metadata_key(
    local: &[u8],
    e: &BytesStart<'_>,
    cover_meta_id: &mut Option<String>,
) -> Option<(String, Option<String>)> {
    if local != b"meta" {
        return Some((String::from_utf8_lossy(local).into_owned(), None));
    }

    if let Some(name) = find_attr(e, b"name") {
        let content = find_attr(e, b"content").unwrap_or_default();
        if name == "cover" && !content.is_empty() {
            *cover_meta_id = Some(content.clone());
        }
        return Some((name, Some(content)));
    }

    find_attr(e, b"property").map(|property| (property, None))
}

fn manifest_item(e: &BytesStart<'_>) -> Option<ManifestItem> {
    let mut item = ManifestItem::default();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => item.id = attr_value(&attr).into_owned(),
            b"href" => item.href = attr_value(&attr).into_owned(),
            b"media-type" => item.media_type = attr_value(&attr).into_owned(),
            b"properties" => {
                item.properties = attr_value(&attr)
                    .split_ascii_whitespace()
                    .map(str::to_string)
                    .collect()
            }
            _ => {}
        }
    }
    (!item.id.is_empty()).then_some(item)
}

fn spine_item(e: &BytesStart<'_>) -> Option<SpineItem> {
    let idref = find_attr(e, b"idref")?;
    let linear = find_attr(e, b"linear").is_none_or(|v| !v.trim().eq_ignore_ascii_case("no"));
    Some(SpineItem { idref, linear })
}

fn find_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| attr_value(&attr).into_owned())
}

/// Attribute value with XML escapes resolved; falls back to the raw text
/// when the value holds an entity we do not know.
fn attr_value<'a>(attr: &'a Attribute<'a>) -> Cow<'a, str> {
    let raw = String::from_utf8_lossy(&attr.value);
    let unescaped = match unescape(&raw) {
        Ok(Cow::Owned(unescaped)) => Some(unescaped),
        _ => None,
    };
    unescaped.map(Cow::Owned).unwrap_or(raw)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|dec| dec.parse().ok())
    };
    code.and_then(char::from_u32).map(String::from)
}
