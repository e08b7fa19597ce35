//! OPF package resolution: container discovery, package document parsing,
//! content-item indexing and metadata extraction.

mod container;
mod index;
mod item;
mod metadata;
mod opf;
mod references;
pub mod xml;

pub use container::{CONTAINER_PATH, parse_container_xml, resolve_package_path};
pub use index::{ContentIndex, LookupKind};
pub use item::{ContentItem, DEFAULT_MEDIA_TYPE, GuideRef, ItemId};
pub use metadata::{
    AttrMatcher, AttrRule, FieldFlags, FieldTemplate, FieldValue, MetadataEngine, MetadataReport,
    Value, builtin_templates,
};
pub use opf::{GuideEntry, PackageDocument};
pub use references::{IdReference, ReferenceKind, find_id_references};
pub use xml::Element;
