//! Content items: one per physical file in the package.

use std::path::PathBuf;

use crate::backend::EntryInfo;

/// Media type assumed when the manifest does not declare one.
pub const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// Stable handle to a [`ContentItem`] inside a [`ContentIndex`](super::ContentIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A `(type, title)` pair contributed by a guide reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideRef {
    pub kind: String,
    pub title: String,
}

/// One addressable file of the package.
///
/// Created from the backend's physical listing, then enriched in place by the
/// manifest, spine and guide passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    /// Path within the package's physical storage. Unique.
    pub root_path: String,
    /// The manifest href, normalized, relative to the package document.
    pub package_path: Option<String>,
    /// Absolute path, only when backed by an extracted directory.
    pub local_path: Option<PathBuf>,
    /// Identifier assigned in the manifest.
    pub manifest_id: Option<String>,

    pub in_manifest: bool,
    pub in_spine: bool,
    pub in_guide: bool,
    pub is_navigation_document: bool,
    /// False only when the spine marks the item `linear="no"`.
    pub is_linear: bool,

    pub media_type: String,
    /// EPUB 3 manifest `properties` tokens (`nav`, `cover-image`, ...).
    pub properties: Vec<String>,
    pub guide_references: Vec<GuideRef>,

    /// Physical entry details reported by the backend.
    pub entry: EntryInfo,
}

impl ContentItem {
    pub fn new(root_path: impl Into<String>) -> Self {
        let root_path = root_path.into();
        Self::from_entry(EntryInfo::new(root_path, 0))
    }

    /// Seed an item from a backend listing entry.
    pub fn from_entry(entry: EntryInfo) -> Self {
        Self {
            root_path: entry.path.clone(),
            package_path: None,
            local_path: entry.local_path.clone(),
            manifest_id: None,
            in_manifest: false,
            in_spine: false,
            in_guide: false,
            is_navigation_document: false,
            is_linear: true,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            properties: Vec::new(),
            guide_references: Vec::new(),
            entry,
        }
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// XML-based content (XHTML, SVG, NCX, ...), by declared media type.
    pub fn is_xml(&self) -> bool {
        self.media_type.ends_with("+xml") || self.media_type.ends_with("xhtml")
    }
}
