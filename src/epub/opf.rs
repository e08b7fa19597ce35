//! OPF package document: manifest, spine and guide.

use super::index::{ContentIndex, LookupKind};
use super::item::{GuideRef, ItemId};
use super::xml::{self, Element};
use crate::backend::ContentBackend;
use crate::error::{Error, Result};
use crate::util::{decode_xml, normalize_href, parent_dir, resolve_href, strip_fragment};

/// A guide `reference` resolved to its item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideEntry {
    pub kind: String,
    pub title: String,
    pub item: ItemId,
}

/// Parsed package document.
///
/// Holds only handles into the [`ContentIndex`]; the items themselves are
/// enriched in place while parsing.
#[derive(Debug, Clone)]
pub struct PackageDocument {
    /// Root-relative path of the package document.
    pub location: String,
    /// Directory manifest hrefs are resolved against.
    pub base_dir: String,
    /// `version` attribute of the `package` element.
    pub version: Option<String>,
    /// Manifest items in declaration order.
    pub manifest: Vec<ItemId>,
    /// Reading order. An item appears once per `itemref`.
    pub spine: Vec<ItemId>,
    pub guide: Vec<GuideEntry>,
    /// Navigation document (NCX via `spine/@toc`, else the EPUB 3 `nav` item).
    pub navigation: Option<ItemId>,
    /// The `metadata` element, kept for template matching.
    pub metadata: Option<Element>,
}

impl PackageDocument {
    /// Read the package document at `location` through `backend` and parse it.
    pub fn read(
        backend: &dyn ContentBackend,
        location: &str,
        index: &mut ContentIndex,
    ) -> Result<Self> {
        let bytes = backend.read_bytes(location).map_err(|e| {
            if e.is_not_found() {
                Error::MalformedContainer(format!("rootfile '{location}' does not exist"))
            } else {
                e
            }
        })?;
        let content = decode_xml(&bytes);
        Self::parse(location, &content, index)
    }

    /// Parse package document `content` located at root path `location`.
    ///
    /// Runs the manifest, spine and guide phases in order; each phase is
    /// skipped when its section is absent. A declaration that cannot be tied
    /// to an item fails the whole parse.
    pub fn parse(location: &str, content: &str, index: &mut ContentIndex) -> Result<Self> {
        let root = xml::parse(content, location)?;

        let mut doc = Self {
            location: location.to_string(),
            base_dir: parent_dir(location).to_string(),
            version: root.non_empty_attr("version").map(String::from),
            manifest: Vec::new(),
            spine: Vec::new(),
            guide: Vec::new(),
            navigation: None,
            metadata: None,
        };

        if let Some(manifest) = find_section(&root, "manifest") {
            doc.read_manifest(manifest, index)?;
        }
        // Package paths and manifest ids are now known
        index.rebuild();

        if let Some(spine) = find_section(&root, "spine") {
            doc.read_spine(spine, index)?;
        }
        if doc.navigation.is_none() {
            doc.navigation = doc.find_nav_property(index);
        }
        if let Some(guide) = find_section(&root, "guide") {
            doc.read_guide(guide, index)?;
        }
        index.refresh();

        doc.metadata = find_section(&root, "metadata").cloned();

        tracing::debug!(
            opf = location,
            manifest = doc.manifest.len(),
            spine = doc.spine.len(),
            guide = doc.guide.len(),
            "Parsed package document"
        );
        Ok(doc)
    }

    fn read_manifest(&mut self, manifest: &Element, index: &mut ContentIndex) -> Result<()> {
        for node in manifest.find_all("item") {
            let href = node.attr("href").unwrap_or_default();
            let id = self.resolve_manifest_href(href, index)?;
            if index[id].in_manifest {
                return Err(Error::DuplicateManifestEntry {
                    first: index[id].package_path.clone().unwrap_or_default(),
                    second: href.to_string(),
                    path: index[id].root_path.clone(),
                });
            }

            let Some(item) = index.get_mut(id) else {
                continue;
            };
            item.in_manifest = true;
            item.package_path = Some(normalize_href(href));
            if let Some(manifest_id) = node.non_empty_attr("id") {
                item.manifest_id = Some(manifest_id.to_string());
            }
            if let Some(media_type) = node.non_empty_attr("media-type") {
                item.media_type = media_type.to_string();
            }
            if let Some(properties) = node.attr("properties") {
                item.properties = properties.split_ascii_whitespace().map(String::from).collect();
            }
            self.manifest.push(id);
        }
        Ok(())
    }

    fn resolve_manifest_href(&self, href: &str, index: &ContentIndex) -> Result<ItemId> {
        let dangling = |path: String| Error::DanglingManifestEntry {
            href: href.to_string(),
            path,
        };

        let path = resolve_href(&self.base_dir, href).ok_or_else(|| dangling(href.to_string()))?;
        if let Ok(id) = index.lookup(LookupKind::RootPath, &path) {
            return Ok(id);
        }
        // Hrefs are URLs; archive names usually are not percent-encoded
        let decoded = percent_encoding::percent_decode_str(&path)
            .decode_utf8()
            .ok()
            .map(|d| d.into_owned());
        decoded
            .and_then(|decoded| index.lookup(LookupKind::RootPath, &decoded).ok())
            .ok_or_else(|| dangling(path))
    }

    fn read_spine(&mut self, spine: &Element, index: &mut ContentIndex) -> Result<()> {
        if let Some(toc) = spine.non_empty_attr("toc") {
            let id = index
                .lookup(LookupKind::ManifestId, toc)
                .map_err(|_| Error::DanglingSpineReference(toc.to_string()))?;
            if let Some(item) = index.get_mut(id) {
                item.is_navigation_document = true;
            }
            self.navigation = Some(id);
        }

        for itemref in spine.find_all("itemref") {
            let idref = itemref.attr("idref").unwrap_or_default();
            let id = index
                .lookup(LookupKind::ManifestId, idref)
                .map_err(|_| Error::DanglingSpineReference(idref.to_string()))?;

            if let Some(item) = index.get_mut(id) {
                item.in_spine = true;
                item.is_linear = itemref.attr("linear") != Some("no");
            }
            self.spine.push(id);
        }
        Ok(())
    }

    fn find_nav_property(&self, index: &mut ContentIndex) -> Option<ItemId> {
        let id = self
            .manifest
            .iter()
            .copied()
            .find(|&id| index[id].has_property("nav"))?;
        if let Some(item) = index.get_mut(id) {
            item.is_navigation_document = true;
        }
        Some(id)
    }

    fn read_guide(&mut self, guide: &Element, index: &mut ContentIndex) -> Result<()> {
        for reference in guide.find_all("reference") {
            let href = reference.attr("href").unwrap_or_default();
            // The fragment addresses a location inside the document; the
            // reference itself belongs to the whole item
            let path = normalize_href(strip_fragment(href));
            let id = index
                .lookup(LookupKind::PackagePath, &path)
                .map_err(|_| Error::DanglingGuideReference(href.to_string()))?;

            let kind = reference.attr("type").unwrap_or_default().to_string();
            let title = reference.attr("title").unwrap_or_default().to_string();
            if let Some(item) = index.get_mut(id) {
                item.in_guide = true;
                item.guide_references.push(GuideRef {
                    kind: kind.clone(),
                    title: title.clone(),
                });
            }
            self.guide.push(GuideEntry { kind, title, item: id });
        }
        Ok(())
    }

    /// Root path of the navigation document, if one was declared.
    pub fn navigation_location<'a>(&self, index: &'a ContentIndex) -> Option<&'a str> {
        self.navigation.map(|id| index[id].root_path.as_str())
    }
}

/// First element with the given local name: the root itself or a descendant.
fn find_section<'a>(root: &'a Element, local: &str) -> Option<&'a Element> {
    if root.local_name() == local {
        Some(root)
    } else {
        root.find(local)
    }
}
