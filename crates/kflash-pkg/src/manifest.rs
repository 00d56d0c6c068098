//! `flash-list.json` manifest model

use serde::Deserialize;

/// Manifest schema versions this tool accepts.
pub const SUPPORTED_VERSIONS: [&str; 2] = ["0.1.0", "0.1.1"];

/// Root object of `flash-list.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashList {
    /// Manifest schema version.
    pub version: String,
    /// Files to flash, in write order.
    pub files: Vec<FileSpec>,
}

/// One file entry of the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    /// Flash address the file is written to.
    pub address: u32,
    /// Path of the payload inside the archive.
    pub bin: String,
    /// Whether to wrap the payload in the length + SHA-256 envelope.
    #[serde(default)]
    pub sha256_prefix: bool,
    /// Whether to reverse the bytes of every aligned 4-byte word (v0.1.1).
    #[serde(default)]
    pub reverse_4_bytes: bool,
}

impl FlashList {
    /// Whether this manifest's version is in the supported set.
    pub fn version_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(&self.version.as_str())
    }
}
