//! Helpers for building EPUB fixtures in memory.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/book.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Package document with a cover image, two chapters, an NCX and a guide.
pub const BOOK_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Agnes Grey</dc:title>
    <dc:creator opf:role="aut">Anne Brontë</dc:creator>
    <dc:identifier id="BookId" opf:scheme="UUID">urn:uuid:0f1c2a4e</dc:identifier>
    <dc:language>en</dc:language>
    <dc:date opf:event="publication">1847-12-01</dc:date>
    <meta name="cover" content="cover"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/chapter%202.xhtml" media-type="application/xhtml+xml"/>
    <item id="notes" href="text/notes.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="notes" linear="no"/>
  </spine>
  <guide>
    <reference type="text" title="Start" href="text/ch1.xhtml#start"/>
    <reference type="notes" title="Notes" href="text/notes.xhtml"/>
  </guide>
</package>"#;

pub const CH1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<h1 id="start">Chapter I</h1>
<p>All true histories contain instruction<a href="notes.xhtml#n1">1</a>.</p>
</body></html>"#;

pub const NOTES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<aside id="n1"><a href="ch1.xhtml#start">Back</a></aside>
</body></html>"#;

/// Files of a complete package, in archive order.
pub fn book_files() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("mimetype", b"application/epub+zip".to_vec()),
        ("META-INF/container.xml", CONTAINER_XML.as_bytes().to_vec()),
        ("OEBPS/book.opf", BOOK_OPF.as_bytes().to_vec()),
        ("OEBPS/toc.ncx", b"<ncx/>".to_vec()),
        ("OEBPS/images/cover.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        ("OEBPS/text/ch1.xhtml", CH1.as_bytes().to_vec()),
        ("OEBPS/text/chapter 2.xhtml", b"<html><body/></html>".to_vec()),
        ("OEBPS/text/notes.xhtml", NOTES.as_bytes().to_vec()),
    ]
}

/// Zip `files`, storing `mimetype` uncompressed like real EPUBs do.
pub fn zip_files<P: AsRef<str>, D: AsRef<[u8]>>(files: &[(P, D)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, data) in files {
        let method = if path.as_ref() == "mimetype" {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        zip.start_file(path.as_ref(), SimpleFileOptions::default().compression_method(method))
            .unwrap();
        zip.write_all(data.as_ref()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn book_zip() -> Vec<u8> {
    zip_files(&book_files())
}

/// The standard book with `path` replaced (or added) with `data`.
pub fn book_zip_with(path: &'static str, data: &str) -> Vec<u8> {
    let mut files = book_files();
    files.retain(|(p, _)| *p != path);
    files.push((path, data.as_bytes().to_vec()));
    zip_files(&files)
}

/// An `OEBPS/book.opf` with the given metadata, manifest, spine and guide bodies.
pub fn opf(metadata: &str, manifest: &str, spine: &str, guide: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"
            xmlns:opf="http://www.idpf.org/2007/opf">{metadata}</metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
  <guide>{guide}</guide>
</package>"#
    )
}
