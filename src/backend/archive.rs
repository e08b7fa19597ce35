//! Random-access ZIP backend.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use zip::{CompressionMethod, ZipArchive};

use super::{ContentBackend, EntryInfo};
use crate::error::{Error, Result};
use crate::io::{ByteSource, FileSource, MemorySource, SourceCursor};

/// Read-only backend over a ZIP archive.
///
/// The central directory is scanned once on open; afterwards each entry is
/// read straight from the [`ByteSource`] using its cached data offset.
pub struct ArchiveBackend {
    source: Arc<dyn ByteSource>,
    /// Entry path -> location of its compressed data.
    locations: HashMap<String, EntryLoc>,
    entries: Vec<EntryInfo>,
}

#[derive(Clone, Copy)]
struct EntryLoc {
    data_offset: u64,
    compressed_size: u64,
    compression: CompressionMethod,
}

impl ArchiveBackend {
    /// Open an archive on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = FileSource::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_source(Arc::new(source))
    }

    /// Open an archive held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_source(Arc::new(MemorySource::new(data)))
    }

    pub fn from_source(source: Arc<dyn ByteSource>) -> Result<Self> {
        let mut archive = ZipArchive::new(SourceCursor::new(source.clone()))?;

        let mut locations = HashMap::with_capacity(archive.len());
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();

            locations.insert(
                name.clone(),
                EntryLoc {
                    data_offset: file.data_start(),
                    compressed_size: file.compressed_size(),
                    compression: file.compression(),
                },
            );
            entries.push(EntryInfo {
                path: name,
                size: file.size(),
                compressed_size: Some(file.compressed_size()),
                compression: Some(file.compression()),
                last_modified: file.last_modified(),
                local_path: None,
            });
        }

        tracing::debug!(entries = entries.len(), "Scanned archive central directory");
        Ok(Self {
            source,
            locations,
            entries,
        })
    }

    fn locate(&self, path: &str) -> Option<EntryLoc> {
        if let Some(loc) = self.locations.get(path) {
            return Some(*loc);
        }
        // Some packages percent-encode hrefs that are stored unencoded
        let decoded = percent_encoding::percent_decode_str(path).decode_utf8().ok()?;
        self.locations.get(decoded.as_ref()).copied()
    }

    fn read_entry(&self, loc: EntryLoc) -> io::Result<Vec<u8>> {
        let compressed = self
            .source
            .read_at(loc.data_offset, loc.compressed_size as usize)?;

        match loc.compression {
            CompressionMethod::Stored => Ok(compressed),
            CompressionMethod::Deflated => {
                let mut decoder = flate2::read::DeflateDecoder::new(&compressed[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
            method => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported compression method: {method:?}"),
            )),
        }
    }
}

impl ContentBackend for ArchiveBackend {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn entries(&self) -> Vec<EntryInfo> {
        self.entries.clone()
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let loc = self.locate(path).ok_or_else(|| {
            Error::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such entry in archive"),
            )
        })?;
        self.read_entry(loc).map_err(|e| Error::io(path, e))
    }

    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        tracing::warn!(path, bytes = data.len(), "Rejecting write to read-only archive");
        Err(Error::io(
            path,
            io::Error::new(
                io::ErrorKind::Unsupported,
                "archive backend is read-only; open the package for writing",
            ),
        ))
    }
}
