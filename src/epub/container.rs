//! `META-INF/container.xml`: where the package document lives.

use super::xml;
use crate::backend::ContentBackend;
use crate::error::{Error, Result};
use crate::util::decode_xml;

/// Fixed location of the container pointer file.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Find the root-relative path of the package document.
///
/// Uses the first `rootfile` element in any namespace.
pub fn resolve_package_path(backend: &dyn ContentBackend) -> Result<String> {
    let bytes = backend
        .read_bytes(CONTAINER_PATH)
        .map_err(|e| Error::MissingContainer(Box::new(e)))?;
    parse_container_xml(&bytes)
}

/// Parse container.xml bytes and return the first rootfile's `full-path`.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = decode_xml(bytes);
    let root = xml::parse(&content, CONTAINER_PATH)?;

    let rootfile = std::iter::once(&root)
        .chain(root.descendants())
        .find(|e| e.local_name() == "rootfile")
        .ok_or_else(|| Error::MalformedContainer("unable to find rootfile".into()))?;

    let full_path = rootfile
        .non_empty_attr("full-path")
        .ok_or_else(|| Error::MalformedContainer("rootfile has no full-path".into()))?;

    tracing::debug!(opf = full_path, "Resolved package document from container");
    Ok(full_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    <rootfile full-path="OEBPS/other.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    #[test]
    fn test_first_rootfile_wins() {
        assert_eq!(parse_container_xml(CONTAINER.as_bytes()).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(CONTAINER.as_bytes());
        assert_eq!(parse_container_xml(&bytes).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_prefixed_rootfile() {
        let xml = r#"<c:container xmlns:c="urn:oasis:names:tc:opendocument:xmlns:container">
  <c:rootfiles><c:rootfile full-path="book.opf"/></c:rootfiles>
</c:container>"#;
        assert_eq!(parse_container_xml(xml.as_bytes()).unwrap(), "book.opf");
    }

    #[test]
    fn test_missing_container() {
        let backend = MemoryBackend::new().with_file("mimetype", "application/epub+zip");
        let err = resolve_package_path(&backend).unwrap_err();
        assert!(matches!(err, Error::MissingContainer(_)));
    }

    #[test]
    fn test_invalid_xml() {
        let backend =
            MemoryBackend::new().with_file(CONTAINER_PATH, "<container><rootfiles></container>");
        match resolve_package_path(&backend).unwrap_err() {
            Error::InvalidXml { path, .. } => assert_eq!(path, CONTAINER_PATH),
            other => panic!("expected InvalidXml, got {other:?}"),
        }
    }

    #[test]
    fn test_no_rootfile() {
        let backend =
            MemoryBackend::new().with_file(CONTAINER_PATH, "<container><rootfiles/></container>");
        assert!(matches!(
            resolve_package_path(&backend),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_rootfile_without_full_path() {
        let bytes = br#"<container><rootfiles><rootfile/></rootfiles></container>"#;
        assert!(matches!(parse_container_xml(bytes), Err(Error::MalformedContainer(_))));
    }
}
