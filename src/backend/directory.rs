//! Extracted-directory backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use super::{ContentBackend, EntryInfo, checked_relative};
use crate::error::{Error, Result};

/// Backend over a package whose files live in a directory.
///
/// Either wraps an existing directory ([`DirectoryBackend::open`]) or owns a
/// scoped temporary directory holding an extracted archive
/// ([`DirectoryBackend::extract`]). The temporary directory is deleted when
/// the backend is dropped, whether the session ended normally or not.
pub struct DirectoryBackend {
    root: PathBuf,
    entries: Vec<EntryInfo>,
    scratch: Option<TempDir>,
}

impl DirectoryBackend {
    /// Use an already-extracted package directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = std::path::absolute(root).map_err(|e| Error::io(root.display().to_string(), e))?;
        if !root.is_dir() {
            return Err(Error::io(
                root.display().to_string(),
                io::Error::new(io::ErrorKind::NotADirectory, "package root is not a directory"),
            ));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::io(root.display().to_string(), e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(EntryInfo {
                local_path: Some(entry.path().to_path_buf()),
                ..EntryInfo::new(path, size)
            });
        }

        tracing::debug!(
            root = %root.display(),
            entries = entries.len(),
            "Walked package directory"
        );
        Ok(Self {
            root,
            entries,
            scratch: None,
        })
    }

    /// Extract every entry of `source` into a fresh temporary directory.
    pub fn extract(source: &dyn ContentBackend) -> Result<Self> {
        let scratch = TempDir::with_prefix("spindle-").map_err(|e| Error::io("<tempdir>", e))?;
        let root = scratch.path().to_path_buf();
        tracing::info!(root = %root.display(), "Extracting package to temporary directory");

        let mut entries = Vec::new();
        for mut entry in source.entries() {
            let data = source.read_bytes(&entry.path)?;
            let local = Self::local_path_in(&root, &entry.path)?;
            Self::write_file(&local, &data).map_err(|e| Error::io(entry.path.as_str(), e))?;
            entry.local_path = Some(local);
            entries.push(entry);
        }

        Ok(Self {
            root,
            entries,
            scratch: Some(scratch),
        })
    }

    /// Absolute location of the package root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `true` when this backend owns a temporary extraction area.
    pub fn is_scratch(&self) -> bool {
        self.scratch.is_some()
    }

    /// Delete the temporary extraction area now, reporting failures.
    ///
    /// Dropping the backend also deletes it, but silently.
    pub fn close(self) -> Result<()> {
        if let Some(scratch) = self.scratch {
            tracing::info!(root = %self.root.display(), "Releasing temporary package directory");
            scratch
                .close()
                .map_err(|e| Error::io(self.root.display().to_string(), e))?;
        }
        Ok(())
    }

    fn local_path_in(root: &Path, path: &str) -> Result<PathBuf> {
        let relative = checked_relative(path).map_err(|e| Error::io(path, e))?;
        Ok(relative.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s)))
    }

    fn write_file(local: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local, data)
    }
}

impl ContentBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn entries(&self) -> Vec<EntryInfo> {
        self.entries.clone()
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let local = Self::local_path_in(&self.root, path)?;
        fs::read(&local).map_err(|e| Error::io(path, e))
    }

    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let local = Self::local_path_in(&self.root, path)?;
        tracing::debug!(path, bytes = data.len(), "Writing package file");
        Self::write_file(&local, data).map_err(|e| Error::io(path, e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        DirectoryBackend::close(*self)
    }
}
