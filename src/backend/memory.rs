//! In-memory backend.

use std::collections::BTreeMap;
use std::io;
use std::sync::{PoisonError, RwLock};

use super::{ContentBackend, EntryInfo, checked_relative};
use crate::error::{Error, Result};

/// Backend keeping every file in a map, for synthesized packages and tests.
///
/// Entries are listed in path order.
#[derive(Default)]
pub struct MemoryBackend {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), data.into());
    }
}

impl ContentBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn entries(&self) -> Vec<EntryInfo> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, data)| EntryInfo::new(path.clone(), data.len() as u64))
            .collect()
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| Error::io(path, io::Error::new(io::ErrorKind::NotFound, "no such file")))
    }

    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = checked_relative(path).map_err(|e| Error::io(path, e))?;
        self.insert(key, data);
        Ok(())
    }
}
