use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::source::ByteSource;

/// Stateful `Read + Seek` view over a shared [`ByteSource`].
///
/// `zip::ZipArchive` wants a cursor; the source itself stays stateless so the
/// archive backend can keep reading entries after the directory scan.
pub struct SourceCursor {
    inner: Arc<dyn ByteSource>,
    position: u64,
}

impl SourceCursor {
    pub fn new(inner: Arc<dyn ByteSource>) -> Self {
        Self { inner, position: 0 }
    }
}

impl Read for SourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.inner.len().saturating_sub(self.position);
        let count = remaining.min(buf.len() as u64) as usize;
        if count == 0 {
            return Ok(0);
        }
        self.inner.read_exact_at(self.position, &mut buf[..count])?;
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for SourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(p) => self.inner.len().checked_add_signed(p),
            SeekFrom::Current(p) => self.position.checked_add_signed(p),
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of source")
        })?;
        Ok(self.position)
    }
}
