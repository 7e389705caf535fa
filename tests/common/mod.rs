//! In-memory EPUB packages for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Test Book</dc:title>
    <dc:creator opf:role="aut">First Author</dc:creator>
    <dc:creator>Second Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="bookid">urn:uuid:1234</dc:identifier>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="Text/chapter2.xhtml" media-type="application/xhtml+xml"/>
    <item id="notes" href="Text/notes.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="Images/cover.png" media-type="image/png"/>
    <item id="css" href="Styles/main.css" media-type="text/css"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="notes" linear="no"/>
  </spine>
</package>"#;

pub const TOC_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:1234"/></head>
  <docTitle><text>Test Book</text></docTitle>
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="Text/chapter1.xhtml"/>
      <navPoint id="np1-1" playOrder="2">
        <navLabel><text>Section 1.1</text></navLabel>
        <content src="Text/chapter1.xhtml#s1"/>
      </navPoint>
    </navPoint>
    <navPoint id="np2" playOrder="3">
      <navLabel><text>Chapter 2</text></navLabel>
      <content src="Text/chapter2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub const CHAPTER1: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
<html xmlns=\"http://www.w3.org/1999/xhtml\">\r\n\
<head><title>One</title><link href=\"../Styles/main.css\" rel=\"stylesheet\" type=\"text/css\"/>\r\n\
<script>alert('head');</script></head>\r\n\
<body onload=\"init()\">\r\n\
<h1 id=\"s1\">Chapter 1</h1>\r\n\
<img src=\"../Images/cover.png\" alt=\"cover\"/>\r\n\
<img src=\"../Images/missing.png\" alt=\"gone\"/>\r\n\
<script type=\"text/javascript\">track();</script>\r\n\
<p onclick=\"go()\"><a href=\"chapter2.xhtml#s2\">Next</a> <a href=\"http://example.com/\">Web</a></p>\r\n\
</body>\r\n\
</html>";

pub const CHAPTER2: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Two</title></head>
<body><h1 id="s2">Chapter 2</h1><p><a href="chapter1.xhtml">Back</a></p></body></html>"#;

pub const NOTES: &str = "<p>Notes fragment without a body.</p>";

pub const COVER_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Builds a package member by member. The mimetype marker is always
/// written first and stored uncompressed.
pub struct PackageBuilder {
    mimetype: Option<Vec<u8>>,
    files: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            mimetype: Some(b"application/epub+zip".to_vec()),
            files: Vec::new(),
        }
    }

    /// The package used across the integration tests.
    pub fn sample() -> Self {
        Self::new()
            .file("META-INF/container.xml", CONTAINER_XML)
            .file("OEBPS/content.opf", CONTENT_OPF)
            .file("OEBPS/toc.ncx", TOC_NCX)
            .file("OEBPS/Text/chapter1.xhtml", CHAPTER1)
            .file("OEBPS/Text/chapter2.xhtml", CHAPTER2)
            .file("OEBPS/Text/notes.xhtml", NOTES)
            .file("OEBPS/Images/cover.png", COVER_PNG)
            .file("OEBPS/Styles/main.css", "p { margin: 0 }")
    }

    pub fn mimetype(mut self, marker: impl AsRef<[u8]>) -> Self {
        self.mimetype = Some(marker.as_ref().to_vec());
        self
    }

    pub fn without_mimetype(mut self) -> Self {
        self.mimetype = None;
        self
    }

    /// Add or replace a member.
    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.files.retain(|(n, _)| n != name);
        self.files.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.files.retain(|(n, _)| n != name);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        if let Some(marker) = self.mimetype {
            let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file("mimetype", stored).unwrap();
            zip.write_all(&marker).unwrap();
        }

        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in self.files {
            zip.start_file(name, deflated).unwrap();
            zip.write_all(&data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}
