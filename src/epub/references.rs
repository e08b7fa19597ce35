//! Search XML content items for element ids and links that point at them.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::index::ContentIndex;
use super::item::ItemId;
use crate::backend::ContentBackend;
use crate::error::Result;
use crate::util::decode_xml;

/// How an item mentions an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An element carries `id="X"`.
    Declaration,
    /// An attribute value ends in `#X` (`href`, `src`, `xlink:href`, ...).
    Link,
}

/// One occurrence of a searched id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdReference {
    pub id: String,
    pub item: ItemId,
    pub kind: ReferenceKind,
}

/// Scan every XML item of `index` for the given ids.
///
/// With no ids, every declaration and every fragment link is reported under
/// the id it names. Hits are reported per item in listing order, then
/// document order. Items that are not well-formed are skipped with a warning.
pub fn find_id_references<S: AsRef<str>>(
    backend: &dyn ContentBackend,
    index: &ContentIndex,
    ids: &[S],
) -> Result<Vec<IdReference>> {
    let mut found = Vec::new();
    for (item_id, item) in index.iter().filter(|(_, item)| item.is_xml()) {
        let bytes = backend.read_bytes(&item.root_path)?;
        let content = decode_xml(&bytes);
        if let Err(e) = scan(&content, ids, item_id, &mut found) {
            tracing::warn!(
                path = %item.root_path,
                error = %e,
                "Skipping unparseable item in id search"
            );
        }
    }

    tracing::debug!(ids = ids.len(), hits = found.len(), "Searched content for id references");
    Ok(found)
}

fn scan<S: AsRef<str>>(
    content: &str,
    ids: &[S],
    item: ItemId,
    found: &mut Vec<IdReference>,
) -> std::result::Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    // Partial results from a failing item are dropped with it
    let start = found.len();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    let value = String::from_utf8_lossy(&attr.value);
                    let (target, kind) = if key == b"id" || key.ends_with(b":id") {
                        (&*value, ReferenceKind::Declaration)
                    } else if let Some((_, fragment)) = value.rsplit_once('#') {
                        (fragment, ReferenceKind::Link)
                    } else {
                        continue;
                    };
                    let matched = if ids.is_empty() {
                        Some(target).filter(|target| !target.is_empty())
                    } else {
                        ids.iter().map(|id| id.as_ref()).find(|id| *id == target)
                    };
                    if let Some(id) = matched {
                        found.push(IdReference {
                            id: id.to_string(),
                            item,
                            kind,
                        });
                    }
                }
            }
            Ok(Event::Eof) => return Ok(()),
            Err(e) => {
                found.truncate(start);
                return Err(e);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::epub::ContentItem;

    fn xhtml(path: &str) -> ContentItem {
        let mut item = ContentItem::new(path);
        item.media_type = "application/xhtml+xml".into();
        item
    }

    #[test]
    fn test_declarations_and_links() {
        let backend = MemoryBackend::new()
            .with_file(
                "OEBPS/ch1.xhtml",
                r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>
<p id="note1">Text<a href="ch2.xhtml#fn2">2</a></p>
<p id="other"/>
</body></html>"#,
            )
            .with_file(
                "OEBPS/ch2.xhtml",
                r#"<html><body>
<aside id="fn2"><a href="ch1.xhtml#note1">back</a></aside>
</body></html>"#,
            )
            .with_file("OEBPS/notes.txt", "id=\"note1\"");
        let mut notes = ContentItem::new("OEBPS/notes.txt");
        notes.media_type = "text/plain".into();
        let index = ContentIndex::new(vec![
            xhtml("OEBPS/ch1.xhtml"),
            xhtml("OEBPS/ch2.xhtml"),
            notes,
        ]);

        let hits = find_id_references(&backend, &index, &["note1", "fn2"]).unwrap();
        let summary: Vec<_> = hits
            .iter()
            .map(|h| (index[h.item].root_path.as_str(), h.id.as_str(), h.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("OEBPS/ch1.xhtml", "note1", ReferenceKind::Declaration),
                ("OEBPS/ch1.xhtml", "fn2", ReferenceKind::Link),
                ("OEBPS/ch2.xhtml", "fn2", ReferenceKind::Declaration),
                ("OEBPS/ch2.xhtml", "note1", ReferenceKind::Link),
            ]
        );
    }

    #[test]
    fn test_malformed_item_is_skipped() {
        let backend = MemoryBackend::new()
            .with_file("a.xhtml", r#"<html><p id="x"></div></html>"#)
            .with_file("b.xhtml", r#"<html><p id="x"/></html>"#);
        let index = ContentIndex::new(vec![xhtml("a.xhtml"), xhtml("b.xhtml")]);

        let hits = find_id_references(&backend, &index, &["x"]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index[hits[0].item].root_path, "b.xhtml");
    }

    #[test]
    fn test_missing_content_is_an_error() {
        let backend = MemoryBackend::new();
        let index = ContentIndex::new(vec![xhtml("gone.xhtml")]);
        assert!(find_id_references(&backend, &index, &["x"]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_no_ids_lists_everything() {
        let backend = MemoryBackend::new()
            .with_file(
                "ch1.xhtml",
                r#"<html><body>
<p id="note1">Text<a href="ch2.xhtml#fn2">2</a><a href="ch2.xhtml">plain</a></p>
<svg:g svg:id="art"/><a href="empty.xhtml#"/>
</body></html>"#,
            )
            .with_file("ch2.xhtml", r#"<html><aside id="fn2"/></html>"#);
        let index = ContentIndex::new(vec![xhtml("ch1.xhtml"), xhtml("ch2.xhtml")]);

        let none: [&str; 0] = [];
        let hits = find_id_references(&backend, &index, &none).unwrap();
        let summary: Vec<_> = hits
            .iter()
            .map(|h| (index[h.item].root_path.as_str(), h.id.as_str(), h.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ch1.xhtml", "note1", ReferenceKind::Declaration),
                ("ch1.xhtml", "fn2", ReferenceKind::Link),
                ("ch1.xhtml", "art", ReferenceKind::Declaration),
                ("ch2.xhtml", "fn2", ReferenceKind::Declaration),
            ]
        );
    }
}
