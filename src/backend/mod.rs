//! Content backends: where the bytes of a package live.
//!
//! The engine reads and writes package files only through
//! [`ContentBackend`]. Which implementation sits underneath (a ZIP archive,
//! an extracted directory, or an in-memory map) is decided when a session is
//! opened and never inspected afterwards.

mod archive;
mod directory;
mod memory;

pub use self::archive::ArchiveBackend;
pub use self::directory::DirectoryBackend;
pub use self::memory::MemoryBackend;

use std::path::PathBuf;

use crate::error::Result;

/// Narrow read/write-bytes contract over a package's physical storage.
///
/// Paths are root-relative and use `/` separators, exactly as they appear in
/// the archive listing.
pub trait ContentBackend: Send + Sync {
    /// Short name of the implementation, used in log events only.
    fn name(&self) -> &'static str;

    /// Physical entries known to the backend, in listing order.
    fn entries(&self) -> Vec<EntryInfo>;

    /// Read the bytes stored under `path`.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Persist `data` under `path`.
    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Release whatever the backend holds, reporting failures.
    ///
    /// Dropping a backend releases the same resources silently.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// One physical entry reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    /// Root-relative path of the entry.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Size as stored in the archive, when archive-backed.
    pub compressed_size: Option<u64>,
    /// Archive compression method, when archive-backed.
    pub compression: Option<zip::CompressionMethod>,
    /// Modification time recorded in the archive.
    pub last_modified: Option<zip::DateTime>,
    /// Absolute filesystem location, only for extracted directories.
    pub local_path: Option<PathBuf>,
}

impl EntryInfo {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            compressed_size: None,
            compression: None,
            last_modified: None,
            local_path: None,
        }
    }
}

/// Reject entry paths that would leave the storage root.
fn checked_relative(path: &str) -> std::io::Result<String> {
    crate::util::resolve_href("", path).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path escapes the package root: {path}"),
        )
    })
}
