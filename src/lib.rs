//! # spindle
//!
//! Resolve EPUB-style packages: find the package document through
//! `META-INF/container.xml`, tie its manifest, spine and guide to the files
//! actually present, and pull typed metadata out with declarative templates.
//!
//! ## Features
//!
//! - Look up any file by root path, package path, extracted path or manifest id
//! - Spine order with linearity, guide references, navigation document location
//! - Template-driven metadata: text, attributes, and references to other items
//! - Read-only ZIP access, or extraction to a scoped temporary directory for
//!   sessions that rewrite files
//!
//! ## Quick Start
//!
//! ```no_run
//! use spindle::{Package, Value};
//!
//! let package = Package::open("book.epub")?;
//!
//! for item in package.spine() {
//!     println!("{} (linear: {})", item.root_path, item.is_linear);
//! }
//!
//! if let Some(title) = package.metadata("title")? {
//!     println!("{:?}", title.first().and_then(Value::as_text));
//! }
//! if let Some(cover) = package.metadata("cover")? {
//!     let item = cover.first().and_then(Value::as_item);
//!     println!("cover: {:?}", item.map(|i| &i.root_path));
//! }
//! # Ok::<(), spindle::Error>(())
//! ```
//!
//! ## Metadata fields
//!
//! Missing or repeated fields do not stop the others from extracting:
//!
//! ```no_run
//! let package = spindle::Package::open("book.epub")?;
//! let report = package.extract_metadata();
//! for (name, value) in &report.values {
//!     println!("{name}: {} value(s)", value.len());
//! }
//! for error in &report.errors {
//!     eprintln!("{error}");
//! }
//! # Ok::<(), spindle::Error>(())
//! ```

pub mod backend;
pub mod epub;
pub mod error;
pub mod io;
pub mod package;
pub(crate) mod util;

pub use backend::{ArchiveBackend, ContentBackend, DirectoryBackend, EntryInfo, MemoryBackend};
pub use epub::{
    AttrMatcher, ContentIndex, ContentItem, FieldFlags, FieldTemplate, FieldValue, ItemId,
    LookupKind, PackageDocument, Value,
};
pub use error::{Error, Result};
pub use package::{OpenMode, OpenOptions, Package};
