//! An open package session.

use std::path::Path;

use crate::backend::{ArchiveBackend, ContentBackend, DirectoryBackend};
use crate::epub::{
    ContentIndex, ContentItem, FieldTemplate, FieldValue, GuideEntry, IdReference, MetadataEngine,
    MetadataReport, PackageDocument, find_id_references, resolve_package_path,
};
use crate::error::Result;

/// How the package's storage is accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Read entries straight out of the archive.
    #[default]
    Read,
    /// Extract into a temporary directory first so items can be rewritten.
    Write,
}

/// Options for opening a [`Package`].
///
/// ```no_run
/// use spindle::{FieldFlags, FieldTemplate, OpenMode, OpenOptions};
///
/// let package = OpenOptions::new()
///     .mode(OpenMode::Write)
///     .template(FieldTemplate::new("publisher", "dc:publisher").flags(FieldFlags::TEXT))
///     .open("book.epub")?;
/// # Ok::<(), spindle::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    mode: OpenMode,
    templates: Vec<FieldTemplate>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Register an extra metadata template alongside the built-in ones.
    pub fn template(mut self, template: FieldTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Open a ZIP package on disk.
    pub fn open(self, path: impl AsRef<Path>) -> Result<Package> {
        let archive = ArchiveBackend::open(path)?;
        self.open_archive(archive)
    }

    /// Open a ZIP package held in memory.
    pub fn open_bytes(self, data: Vec<u8>) -> Result<Package> {
        let archive = ArchiveBackend::from_bytes(data)?;
        self.open_archive(archive)
    }

    /// Open an already-extracted package directory. Always writable.
    pub fn open_dir(self, root: impl AsRef<Path>) -> Result<Package> {
        let backend = DirectoryBackend::open(root)?;
        self.open_backend(Box::new(backend))
    }

    /// Open a package over any backend. The mode is ignored.
    pub fn open_backend(self, backend: Box<dyn ContentBackend>) -> Result<Package> {
        Package::load(backend, self.templates)
    }

    fn open_archive(self, archive: ArchiveBackend) -> Result<Package> {
        let backend: Box<dyn ContentBackend> = match self.mode {
            OpenMode::Read => Box::new(archive),
            OpenMode::Write => Box::new(DirectoryBackend::extract(&archive)?),
        };
        // A failed parse drops the backend, removing any extraction directory
        self.open_backend(backend)
    }
}

/// A parsed package: its storage, content items, package document and
/// metadata templates.
pub struct Package {
    backend: Box<dyn ContentBackend>,
    index: ContentIndex,
    document: PackageDocument,
    metadata: MetadataEngine,
}

impl Package {
    /// Open a ZIP package read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        OpenOptions::new().open(path)
    }

    /// Open a ZIP package held in memory, read-only.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        OpenOptions::new().open_bytes(data)
    }

    /// Open an extracted package directory.
    pub fn open_dir(root: impl AsRef<Path>) -> Result<Self> {
        OpenOptions::new().open_dir(root)
    }

    pub fn from_backend(backend: Box<dyn ContentBackend>) -> Result<Self> {
        OpenOptions::new().open_backend(backend)
    }

    fn load(backend: Box<dyn ContentBackend>, templates: Vec<FieldTemplate>) -> Result<Self> {
        let location = resolve_package_path(backend.as_ref())?;
        let mut index = ContentIndex::from_entries(backend.entries());
        let document = PackageDocument::read(backend.as_ref(), &location, &mut index)?;

        let mut metadata = MetadataEngine::new();
        for template in templates {
            metadata.register(template)?;
        }
        metadata.scan(document.metadata.as_ref());

        tracing::debug!(
            backend = backend.name(),
            opf = %location,
            items = index.len(),
            manifest = document.manifest.len(),
            spine = document.spine.len(),
            "Opened package"
        );
        Ok(Self {
            backend,
            index,
            document,
            metadata,
        })
    }

    pub fn index(&self) -> &ContentIndex {
        &self.index
    }

    pub fn document(&self) -> &PackageDocument {
        &self.document
    }

    /// Root-relative path of the package document.
    pub fn location(&self) -> &str {
        &self.document.location
    }

    /// Manifest items in declaration order.
    pub fn manifest(&self) -> impl Iterator<Item = &ContentItem> {
        self.document.manifest.iter().map(|&id| &self.index[id])
    }

    /// Spine items in reading order.
    pub fn spine(&self) -> impl Iterator<Item = &ContentItem> {
        self.document.spine.iter().map(|&id| &self.index[id])
    }

    pub fn guide(&self) -> impl Iterator<Item = (&GuideEntry, &ContentItem)> {
        self.document.guide.iter().map(|entry| (entry, &self.index[entry.item]))
    }

    /// Navigation document (NCX or EPUB 3 nav). Only located, never parsed.
    pub fn navigation(&self) -> Option<&ContentItem> {
        self.document.navigation.map(|id| &self.index[id])
    }

    /// Root path of the navigation document.
    pub fn navigation_path(&self) -> Option<&str> {
        self.document.navigation_location(&self.index)
    }

    /// Value of one metadata field. See [`MetadataEngine::get`].
    pub fn metadata(&self, name: &str) -> Result<Option<FieldValue<'_>>> {
        self.metadata.get(name, &self.index)
    }

    /// Every metadata field, with per-field failures collected.
    pub fn extract_metadata(&self) -> MetadataReport<'_> {
        self.metadata.extract_all(&self.index)
    }

    pub fn metadata_engine(&self) -> &MetadataEngine {
        &self.metadata
    }

    /// Add a metadata template; it is matched against the metadata section
    /// straight away.
    pub fn register_template(&mut self, template: FieldTemplate) -> Result<()> {
        self.metadata.register(template)
    }

    pub fn read_item(&self, item: &ContentItem) -> Result<Vec<u8>> {
        self.backend.read_bytes(&item.root_path)
    }

    /// Replace an item's bytes. Fails on read-only sessions.
    pub fn write_item(&self, item: &ContentItem, data: &[u8]) -> Result<()> {
        self.backend.write_bytes(&item.root_path, data)
    }

    /// Where the given element ids are declared and linked across XML items.
    pub fn find_id_references<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<IdReference>> {
        find_id_references(self.backend.as_ref(), &self.index, ids)
    }

    /// End the session, removing any temporary extraction directory.
    ///
    /// Dropping the package does the same but ignores failures.
    pub fn close(self) -> Result<()> {
        self.backend.close()
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("backend", &self.backend.name())
            .field("location", &self.document.location)
            .field("items", &self.index.len())
            .finish_non_exhaustive()
    }
}
