//! Error types for package reading

use thiserror::Error;

/// Errors raised while opening or reading a `.kfpkg` package.
#[derive(Debug, Error)]
pub enum Error {
    /// The archive has no `flash-list.json` at its root.
    #[error("package does not contain flash-list.json")]
    MissingManifest,

    /// The manifest declares a version this tool does not understand.
    #[error("unsupported package version {0:?}")]
    UnsupportedVersion(String),

    /// The manifest references an entry the archive does not contain.
    #[error("package entry {0:?} not found in archive")]
    MissingEntry(String),

    /// The manifest is not valid JSON or does not match the schema.
    #[error("malformed flash-list.json: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The zip container itself is damaged or unreadable.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error while reading the package.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;
