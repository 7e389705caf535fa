//! Extraction to disk with in-place reference rewriting.

mod common;

use std::fs;

use common::{COVER_PNG, PackageBuilder};
use folio::{Epub, Options};
use tempfile::TempDir;

fn rooted() -> Options {
    Options::new().with_image_root("/static").with_link_root("/read")
}

#[test]
fn test_extract_selected_rewrites_documents() {
    let dir = TempDir::new().unwrap();
    let epub = Epub::from_bytes_with(PackageBuilder::sample().build(), rooted()).unwrap();

    let written = epub.extract(dir.path(), &["ch1", "cover-img"]).unwrap();
    assert_eq!(
        written,
        vec![
            dir.path().join("OEBPS/Text/chapter1.xhtml"),
            dir.path().join("OEBPS/Images/cover.png"),
        ]
    );

    let chapter = fs::read_to_string(dir.path().join("OEBPS/Text/chapter1.xhtml")).unwrap();
    assert!(chapter.contains(r#"<img src="/static/OEBPS/Images/cover.png" alt="cover"/>"#));
    assert!(chapter.contains(r#"<a href="/read/OEBPS/Text/chapter2.xhtml#s2">"#));
    assert!(chapter.contains(r#"<link href="/read/OEBPS/Styles/main.css""#));
    // Extraction rewrites references only; the document is otherwise intact.
    assert!(chapter.contains("<script>alert('head');</script>"));
    assert!(chapter.contains("<p onclick=\"go()\">"));
    assert!(chapter.contains("\r\n"));

    assert_eq!(fs::read(dir.path().join("OEBPS/Images/cover.png")).unwrap(), COVER_PNG);
    assert!(!dir.path().join("OEBPS/Text/chapter2.xhtml").exists());
}

#[test]
fn test_extract_keeps_legacy_encoding() {
    let dir = TempDir::new().unwrap();
    let notes: &[u8] = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>\n\
<html><body><p>caf\xE9 \x93q\x94</p><img src=\"../Images/cover.png\"/>\
<a href=\"chapter1.xhtml\">\xA7 1</a></body></html>";
    let bytes = PackageBuilder::sample().file("OEBPS/Text/notes.xhtml", notes).build();
    let epub = Epub::from_bytes_with(bytes, rooted()).unwrap();

    epub.extract(dir.path(), &["notes"]).unwrap();
    let expected: &[u8] = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>\n\
<html><body><p>caf\xE9 \x93q\x94</p><img src=\"/static/OEBPS/Images/cover.png\"/>\
<a href=\"/read/OEBPS/Text/chapter1.xhtml\">\xA7 1</a></body></html>";
    assert_eq!(fs::read(dir.path().join("OEBPS/Text/notes.xhtml")).unwrap(), expected);
}

#[test]
fn test_extract_keeps_byte_order_mark() {
    let dir = TempDir::new().unwrap();
    let chapter2 = format!("\u{feff}{}", common::CHAPTER2);
    let bytes = PackageBuilder::sample().file("OEBPS/Text/chapter2.xhtml", chapter2).build();
    let epub = Epub::from_bytes_with(bytes, rooted()).unwrap();

    epub.extract(dir.path(), &["ch2"]).unwrap();
    let written = fs::read(dir.path().join("OEBPS/Text/chapter2.xhtml")).unwrap();
    let expected = format!(
        "\u{feff}{}",
        common::CHAPTER2.replace("\"chapter1.xhtml\"", "\"/read/OEBPS/Text/chapter1.xhtml\"")
    );
    assert_eq!(written, expected.as_bytes());
    assert!(written.starts_with(b"\xEF\xBB\xBF"));
}

#[test]
fn test_extract_member_stored_percent_encoded() {
    let dir = TempDir::new().unwrap();
    let opf = common::CONTENT_OPF.replace(
        "<item id=\"css\"",
        "<item id=\"pic\" href=\"Images/My%20Pic.png\" media-type=\"image/png\"/>\n    <item id=\"css\"",
    );
    let bytes = PackageBuilder::sample()
        .file("OEBPS/content.opf", opf)
        .file("OEBPS/Images/My%20Pic.png", COVER_PNG)
        .build();
    let epub = Epub::from_bytes(bytes).unwrap();

    assert_eq!(epub.manifest_entry("pic").unwrap().href, "OEBPS/Images/My Pic.png");
    assert_eq!(epub.read_image("pic").unwrap(), COVER_PNG);

    let written = epub.extract(dir.path(), &["pic"]).unwrap();
    assert_eq!(written, vec![dir.path().join("OEBPS/Images/My%20Pic.png")]);
    assert_eq!(fs::read(&written[0]).unwrap(), COVER_PNG);
}

#[test]
fn test_extract_unknown_id_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let epub = Epub::from_bytes(PackageBuilder::sample().build()).unwrap();

    let err = epub.extract(dir.path(), &["ch1", "missing"]).unwrap_err();
    assert!(err.is_not_found());
    assert!(!dir.path().join("OEBPS").exists());
}

#[test]
fn test_extract_all() {
    let dir = TempDir::new().unwrap();
    let epub = Epub::from_bytes_with(PackageBuilder::sample().build(), rooted()).unwrap();

    let written = epub.extract_all(dir.path()).unwrap();
    assert_eq!(written.len(), 9);

    assert_eq!(fs::read_to_string(dir.path().join("mimetype")).unwrap(), "application/epub+zip");
    assert!(dir.path().join("META-INF/container.xml").is_file());
    assert_eq!(
        fs::read_to_string(dir.path().join("OEBPS/Styles/main.css")).unwrap(),
        "p { margin: 0 }"
    );

    let chapter2 = fs::read_to_string(dir.path().join("OEBPS/Text/chapter2.xhtml")).unwrap();
    assert!(chapter2.contains(r#"<a href="/read/OEBPS/Text/chapter1.xhtml">Back</a>"#));

    // Non-document members are never rewritten.
    let opf = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    assert_eq!(opf, common::CONTENT_OPF);
}

#[test]
fn test_extract_again_yields_same_document() {
    let dir = TempDir::new().unwrap();
    let epub = Epub::from_bytes_with(PackageBuilder::sample().build(), rooted()).unwrap();

    epub.extract_all(dir.path()).unwrap();
    let first = fs::read_to_string(dir.path().join("OEBPS/Text/chapter1.xhtml")).unwrap();
    epub.extract(dir.path(), &["ch1"]).unwrap();
    let second = fs::read_to_string(dir.path().join("OEBPS/Text/chapter1.xhtml")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_extract_skips_entries_outside_root() {
    let dir = TempDir::new().unwrap();
    let opf = common::CONTENT_OPF.replace(
        "<item id=\"css\"",
        "<item id=\"evil\" href=\"../../outside.xhtml\" media-type=\"application/xhtml+xml\"/>\n    <item id=\"css\"",
    );
    let bytes = PackageBuilder::sample().file("OEBPS/content.opf", opf).build();
    let epub = Epub::from_bytes(bytes).unwrap();

    assert_eq!(epub.manifest_entry("evil").unwrap().href, "../outside.xhtml");
    let written = epub.extract(dir.path().join("out"), &["evil"]).unwrap();
    assert!(written.is_empty());
    assert!(!dir.path().join("outside.xhtml").exists());
}

#[test]
fn test_extract_to_unwritable_destination() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();

    let epub = Epub::from_bytes(PackageBuilder::sample().build()).unwrap();
    assert!(matches!(
        epub.extract(blocker.join("sub"), &["ch1"]),
        Err(folio::Error::Io(_))
    ));
}
