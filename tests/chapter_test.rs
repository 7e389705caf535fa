//! Document access: chapter rendering, raw reads and media-type checks.

mod common;

use std::io::Write;

use common::{COVER_PNG, PackageBuilder};
use folio::{Epub, Error, Options, Traversal};
use tempfile::NamedTempFile;

fn sample_with(options: Options) -> Epub {
    Epub::from_bytes_with(PackageBuilder::sample().build(), options).unwrap()
}

fn rooted() -> Options {
    Options::new().with_image_root("/static").with_link_root("/read")
}

#[test]
fn test_chapter_rendering() {
    let epub = sample_with(rooted());
    let html = epub.chapter("ch1").unwrap();
    assert_eq!(
        html,
        "\n<h1 id=\"s1\">Chapter 1</h1>\n\
<img src=\"/static/OEBPS/Images/cover.png\" alt=\"cover\"/>\n\
<img src=\"../Images/missing.png\" alt=\"gone\"/>\n\
\n\
<p data-inert-onclick=\"go()\"><a href=\"/read/OEBPS/Text/chapter2.xhtml#s2\">Next</a> <a href=\"http://example.com/\">Web</a></p>\n"
    );
}

#[test]
fn test_chapter_without_roots() {
    let epub = sample_with(Options::new());
    let html = epub.chapter("ch1").unwrap();
    assert!(html.contains(r#"<img src="OEBPS/Images/cover.png" alt="cover"/>"#));
    assert!(html.contains(r#"<a href="OEBPS/Text/chapter2.xhtml#s2">Next</a>"#));
    assert!(!html.contains('\r'));
}

#[test]
fn test_chapter_keeps_unresolved_reference() {
    let epub = sample_with(rooted());
    let html = epub.chapter("ch1").unwrap();
    assert!(html.contains(r#"<img src="../Images/missing.png" alt="gone"/>"#));
}

#[test]
fn test_spine_chapter() {
    let epub = sample_with(rooted());
    assert_eq!(
        epub.spine_chapter(1).unwrap(),
        r#"<h1 id="s2">Chapter 2</h1><p><a href="/read/OEBPS/Text/chapter1.xhtml">Back</a></p>"#
    );
    assert_eq!(epub.spine_chapter(0).unwrap(), epub.chapter("ch1").unwrap());
    assert!(epub.spine_chapter(3).unwrap_err().is_not_found());
}

#[test]
fn test_chapter_without_body_falls_back_to_document() {
    let epub = sample_with(Options::new());
    assert_eq!(epub.chapter("notes").unwrap(), "<p>Notes fragment without a body.</p>");
}

#[test]
fn test_chapter_sanitize_disabled() {
    let epub = sample_with(rooted().with_sanitize(false));
    let html = epub.chapter("ch1").unwrap();
    assert!(html.contains("<script type=\"text/javascript\">track();</script>"));
    assert!(html.contains("<p onclick=\"go()\">"));
    // Head content is still cut away with the body extraction.
    assert!(!html.contains("alert('head')"));
    assert!(html.contains("/static/OEBPS/Images/cover.png"));
}

#[test]
fn test_chapter_legacy_encoding() {
    let bytes = PackageBuilder::sample()
        .file("OEBPS/Text/notes.xhtml", b"<html><body><p>caf\xE9 \x93quoted\x94</p></body></html>")
        .build();
    let epub = Epub::from_bytes(bytes).unwrap();
    assert_eq!(epub.chapter("notes").unwrap(), "<p>caf\u{e9} \u{201C}quoted\u{201D}</p>");
}

#[test]
fn test_chapter_traversal_option() {
    let bytes = PackageBuilder::sample()
        .file(
            "OEBPS/Text/notes.xhtml",
            r#"<body><img src="../../../../OEBPS/Images/cover.png"/></body>"#,
        )
        .build();

    let preserve = Epub::from_bytes_with(bytes.clone(), Options::new().with_image_root("/i")).unwrap();
    assert_eq!(
        preserve.chapter("notes").unwrap(),
        r#"<img src="../../../../OEBPS/Images/cover.png"/>"#
    );

    let clamp = Epub::from_bytes_with(
        bytes,
        Options::new().with_image_root("/i").with_traversal(Traversal::Clamp),
    )
    .unwrap();
    assert_eq!(clamp.chapter("notes").unwrap(), r#"<img src="/i/OEBPS/Images/cover.png"/>"#);
}

#[test]
fn test_image_access_requires_image_media_type() {
    let epub = sample_with(Options::new());

    assert_eq!(epub.read_image("cover-img").unwrap(), COVER_PNG);
    assert!(matches!(
        epub.read_image("ch1"),
        Err(Error::UnsupportedMediaType { ref id, .. }) if id == "ch1"
    ));
}

#[test]
fn test_document_access_on_image_entry() {
    let epub = sample_with(Options::new());

    // The generic raw read serves any media type.
    assert_eq!(epub.read_file("cover-img").unwrap(), COVER_PNG);
    assert!(matches!(
        epub.chapter("cover-img"),
        Err(Error::UnsupportedMediaType { ref media_type, .. }) if media_type == "image/png"
    ));
    assert!(matches!(epub.chapter("css"), Err(Error::UnsupportedMediaType { .. })));
}

#[test]
fn test_unknown_id_is_entry_not_found() {
    let epub = sample_with(Options::new());
    assert!(matches!(epub.chapter("nope"), Err(Error::EntryNotFound(_))));
    assert!(epub.read_file("nope").unwrap_err().is_not_found());
    assert!(epub.read_image("nope").unwrap_err().is_not_found());
}

#[test]
fn test_declared_but_absent_member() {
    let bytes = PackageBuilder::sample().without("OEBPS/Text/chapter2.xhtml").build();
    let epub = Epub::from_bytes(bytes).unwrap();
    assert!(epub.chapter("ch2").unwrap_err().is_not_found());
}

#[test]
fn test_open_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&PackageBuilder::sample().build()).unwrap();
    file.flush().unwrap();

    let epub = Epub::open_with(file.path(), rooted()).unwrap();
    assert_eq!(epub.metadata().title(), Some("Test Book"));
    assert_eq!(epub.toc().len(), 2);
    // Each read reopens the file.
    assert!(epub.chapter("ch1").unwrap().contains("/static/OEBPS/Images/cover.png"));
    assert!(epub.chapter("ch2").unwrap().contains("/read/OEBPS/Text/chapter1.xhtml"));
}

#[test]
fn test_open_missing_file_is_io_error() {
    assert!(matches!(
        Epub::open("/nonexistent/definitely/missing.epub"),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_spine_entries() {
    let epub = sample_with(Options::new());
    let hrefs: Vec<_> = epub
        .spine_entries()
        .map(|entry| entry.unwrap().href.clone())
        .collect();
    assert_eq!(
        hrefs,
        vec!["OEBPS/Text/chapter1.xhtml", "OEBPS/Text/chapter2.xhtml", "OEBPS/Text/notes.xhtml"]
    );
}
