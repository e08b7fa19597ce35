//! Multi-key directory over the content items of a package.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::item::{ContentItem, ItemId};
use crate::backend::EntryInfo;
use crate::error::{Error, Result};

/// Which addressing scheme a lookup used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    RootPath,
    PackagePath,
    BackendPath,
    ManifestId,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RootPath => "root path",
            Self::PackagePath => "package path",
            Self::BackendPath => "backend path",
            Self::ManifestId => "manifest id",
        })
    }
}

/// Owns the content items and four lookup maps derived from them.
///
/// The maps are never patched one key at a time: any mutable access to an
/// item marks the index dirty and [`refresh`](Self::refresh) rebuilds all
/// four from scratch. Lookups read whatever the last rebuild produced.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    items: Vec<ContentItem>,
    by_root: HashMap<String, ItemId>,
    by_package: HashMap<String, ItemId>,
    by_backend: HashMap<PathBuf, ItemId>,
    by_manifest_id: HashMap<String, ItemId>,
    dirty: bool,
}

impl ContentIndex {
    /// Build an index over `items`. Items are addressed by position.
    pub fn new(items: Vec<ContentItem>) -> Self {
        let mut index = Self {
            items,
            ..Self::default()
        };
        index.rebuild();
        index
    }

    /// One item per physical entry of a backend listing.
    pub fn from_entries(entries: Vec<EntryInfo>) -> Self {
        Self::new(entries.into_iter().map(ContentItem::from_entry).collect())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All items with their handles, in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &ContentItem)> {
        self.items.iter().enumerate().map(|(i, item)| (ItemId(i), item))
    }

    pub fn get(&self, id: ItemId) -> Option<&ContentItem> {
        self.items.get(id.0)
    }

    /// Mutable access to one item. Marks the index dirty.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut ContentItem> {
        self.dirty = true;
        self.items.get_mut(id.0)
    }

    /// Clear the four maps and re-insert every item under every key it has.
    ///
    /// When two items claim the same key the first in listing order keeps it.
    pub fn rebuild(&mut self) {
        self.by_root.clear();
        self.by_package.clear();
        self.by_backend.clear();
        self.by_manifest_id.clear();

        for (i, item) in self.items.iter().enumerate() {
            let id = ItemId(i);
            claim(&mut self.by_root, item.root_path.clone(), id, LookupKind::RootPath);
            if let Some(path) = non_empty(&item.package_path) {
                claim(&mut self.by_package, path.to_string(), id, LookupKind::PackagePath);
            }
            if let Some(path) = &item.local_path {
                claim(&mut self.by_backend, path.clone(), id, LookupKind::BackendPath);
            }
            if let Some(manifest_id) = non_empty(&item.manifest_id) {
                claim(
                    &mut self.by_manifest_id,
                    manifest_id.to_string(),
                    id,
                    LookupKind::ManifestId,
                );
            }
        }

        self.dirty = false;
        tracing::trace!(items = self.items.len(), "Rebuilt content index");
    }

    /// Rebuild only if an item was mutated since the last rebuild.
    pub fn refresh(&mut self) {
        if self.dirty {
            self.rebuild();
        }
    }

    /// Resolve `key` under the given addressing scheme.
    pub fn lookup(&self, kind: LookupKind, key: &str) -> Result<ItemId> {
        let found = match kind {
            LookupKind::RootPath => self.by_root.get(key),
            LookupKind::PackagePath => self.by_package.get(key),
            LookupKind::BackendPath => self.by_backend.get(Path::new(key)),
            LookupKind::ManifestId => self.by_manifest_id.get(key),
        };
        found.copied().ok_or_else(|| Error::NotFound {
            kind,
            key: key.to_string(),
        })
    }

    pub fn by_root_path(&self, path: &str) -> Result<&ContentItem> {
        self.resolve(LookupKind::RootPath, path)
    }

    pub fn by_package_path(&self, path: &str) -> Result<&ContentItem> {
        self.resolve(LookupKind::PackagePath, path)
    }

    pub fn by_backend_path(&self, path: impl AsRef<Path>) -> Result<&ContentItem> {
        let path = path.as_ref();
        self.by_backend
            .get(path)
            .map(|id| &self.items[id.0])
            .ok_or_else(|| Error::NotFound {
                kind: LookupKind::BackendPath,
                key: path.display().to_string(),
            })
    }

    pub fn by_manifest_id(&self, id: &str) -> Result<&ContentItem> {
        self.resolve(LookupKind::ManifestId, id)
    }

    fn resolve(&self, kind: LookupKind, key: &str) -> Result<&ContentItem> {
        let id = self.lookup(kind, key)?;
        Ok(&self.items[id.0])
    }
}

impl std::ops::Index<ItemId> for ContentIndex {
    type Output = ContentItem;

    fn index(&self, id: ItemId) -> &ContentItem {
        &self.items[id.0]
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn claim<K>(map: &mut HashMap<K, ItemId>, key: K, id: ItemId, kind: LookupKind)
where
    K: std::hash::Hash + Eq + fmt::Debug,
{
    match map.entry(key) {
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert(id);
        }
        std::collections::hash_map::Entry::Occupied(slot) => {
            tracing::warn!(
                %kind,
                key = ?slot.key(),
                "Duplicate key in content index; keeping first"
            );
        }
    }
}
