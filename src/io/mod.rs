//! Random-access byte sources for archive-backed packages.

mod cursor;
mod source;

pub use cursor::SourceCursor;
pub use source::{ByteSource, FileSource, MemorySource};
