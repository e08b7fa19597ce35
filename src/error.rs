//! Error types for package resolution.

use std::io;

use thiserror::Error;

use crate::epub::LookupKind;

/// Errors that can occur while opening, resolving or querying a package.
///
/// Structural errors (container, package document, dangling references) are
/// fatal to a parse. Metadata field errors are reported per field. Index
/// misses ([`Error::NotFound`]) are recoverable by the caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("archive unreadable: {0}")]
    ArchiveUnreadable(#[from] zip::result::ZipError),

    #[error("META-INF/container.xml is missing or unreadable")]
    MissingContainer(#[source] Box<Error>),

    #[error("{path} is invalid XML: {source}")]
    InvalidXml {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("META-INF/container.xml is improperly formatted: {0}")]
    MalformedContainer(String),

    #[error("manifest entry '{href}' has no file at '{path}'")]
    DanglingManifestEntry { href: String, path: String },

    #[error("manifest entries '{first}' and '{second}' both declare '{path}'")]
    DuplicateManifestEntry {
        first: String,
        second: String,
        path: String,
    },

    #[error("spine references unknown manifest id '{0}'")]
    DanglingSpineReference(String),

    #[error("guide references unknown manifest href '{0}'")]
    DanglingGuideReference(String),

    #[error("required metadata field '{0}' has no matching element")]
    MissingRequiredField(String),

    #[error("metadata field '{field}' must be unique but matched {count} elements")]
    DuplicateUniqueField { field: String, count: usize },

    #[error("a metadata template named '{0}' is already registered")]
    DuplicateTemplate(String),

    #[error("no content item with {kind} '{key}'")]
    NotFound { kind: LookupKind, key: String },

    #[error("I/O error on '{path}': {source}")]
    BackendIo {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::BackendIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn xml(path: impl Into<String>, source: impl Into<quick_xml::Error>) -> Self {
        Self::InvalidXml {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Returns `true` if this error is fatal to a package parse.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ArchiveUnreadable(_)
                | Self::MissingContainer(_)
                | Self::InvalidXml { .. }
                | Self::MalformedContainer(_)
                | Self::DanglingManifestEntry { .. }
                | Self::DuplicateManifestEntry { .. }
                | Self::DanglingSpineReference(_)
                | Self::DanglingGuideReference(_)
        )
    }

    /// Returns `true` for an index miss on a key that simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::BackendIo { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
