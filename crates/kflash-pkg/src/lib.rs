//! kflash-pkg - `.kfpkg` flash package reader
//!
//! A `.kfpkg` package is a zip archive carrying a `flash-list.json` manifest
//! at its root plus one payload entry per referenced `bin` path. The package
//! owns the archive; [FlashFile] handles borrow entries out of it lazily and
//! cannot outlive it.
//!
//! # Example
//!
//! ```no_run
//! use kflash_pkg::FlashPackage;
//!
//! let mut package = FlashPackage::open("firmware.kfpkg".as_ref())?;
//! for spec in package.files().to_vec() {
//!     let mut file = package.open_file(&spec)?;
//!     println!("{} -> 0x{:08X} ({} bytes)", spec.bin, spec.address, file.length);
//!     let bytes = file.read_all()?;
//!     // hand bytes to the flashing engine
//!     # let _ = bytes;
//! }
//! # Ok::<(), kflash_pkg::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod manifest;

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::read::ZipFile;
use zip::ZipArchive;

pub use error::{Error, Result};
pub use manifest::{FileSpec, FlashList, SUPPORTED_VERSIONS};

/// Name of the manifest entry at the archive root.
pub const MANIFEST_NAME: &str = "flash-list.json";

/// A read-only `.kfpkg` package.
pub struct FlashPackage<R: Read + Seek = File> {
    archive: ZipArchive<R>,
    manifest: FlashList,
}

impl FlashPackage<File> {
    /// Opens the package at `path` and validates its manifest.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> FlashPackage<R> {
    /// Reads a package from any seekable source and validates its manifest.
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let manifest: FlashList = {
            let entry = match archive.by_name(MANIFEST_NAME) {
                Ok(entry) => entry,
                Err(zip::result::ZipError::FileNotFound) => {
                    return Err(Error::MissingManifest)
                }
                Err(e) => return Err(Error::Archive(e)),
            };
            serde_json::from_reader(entry)?
        };

        if !manifest.version_supported() {
            return Err(Error::UnsupportedVersion(manifest.version));
        }

        log::debug!(
            "Package manifest version {} with {} file(s)",
            manifest.version,
            manifest.files.len()
        );

        Ok(Self { archive, manifest })
    }

    /// Manifest schema version.
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    /// File entries in write order.
    pub fn files(&self) -> &[FileSpec] {
        &self.manifest.files
    }

    /// Opens the payload entry for `spec` as a lazy byte stream.
    pub fn open_file(&mut self, spec: &FileSpec) -> Result<FlashFile<'_>> {
        let entry = match self.archive.by_name(&spec.bin) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(Error::MissingEntry(spec.bin.clone()))
            }
            Err(e) => return Err(Error::Archive(e)),
        };
        Ok(FlashFile {
            address: spec.address,
            sha256_prefix: spec.sha256_prefix,
            reverse_4_bytes: spec.reverse_4_bytes,
            length: entry.size(),
            entry,
        })
    }
}

/// One payload entry, borrowed from its package.
pub struct FlashFile<'a> {
    /// Flash address the payload is written to.
    pub address: u32,
    /// Whether to wrap the payload in the length + SHA-256 envelope.
    pub sha256_prefix: bool,
    /// Whether to reverse the bytes of every aligned 4-byte word.
    pub reverse_4_bytes: bool,
    /// Uncompressed payload length in bytes.
    pub length: u64,
    entry: ZipFile<'a>,
}

impl FlashFile<'_> {
    /// Reads the whole payload into memory.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.length as usize);
        self.entry.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Read for FlashFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.entry.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_package(manifest: &str, entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(MANIFEST_NAME, FileOptions::default())
            .unwrap();
        writer.write_all(manifest.as_bytes()).unwrap();
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        Cursor::new(writer.finish().unwrap().into_inner())
    }

    #[test]
    fn opens_package_and_reads_entries_in_order() {
        let manifest = r#"{
            "version": "0.1.0",
            "files": [
                { "address": 0, "bin": "firmware.bin", "sha256Prefix": true },
                { "address": 4194304, "bin": "model.kmodel", "sha256Prefix": false }
            ]
        }"#;
        let reader = build_package(
            manifest,
            &[
                ("firmware.bin", &[0x5A; 64]),
                ("model.kmodel", &[0xA5; 16]),
            ],
        );
        let mut package = FlashPackage::from_reader(reader).unwrap();

        assert_eq!(package.version(), "0.1.0");
        let specs = package.files().to_vec();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].address, 0);
        assert_eq!(specs[1].address, 0x40_0000);

        let mut first = package.open_file(&specs[0]).unwrap();
        assert_eq!(first.length, 64);
        assert!(first.sha256_prefix);
        assert_eq!(first.read_all().unwrap(), vec![0x5A; 64]);
        drop(first);

        let mut second = package.open_file(&specs[1]).unwrap();
        assert_eq!(second.read_all().unwrap(), vec![0xA5; 16]);
    }

    #[test]
    fn unsupported_version_is_rejected_up_front() {
        let manifest = r#"{ "version": "0.2.0", "files": [] }"#;
        let reader = build_package(manifest, &[]);
        match FlashPackage::from_reader(reader) {
            Err(Error::UnsupportedVersion(v)) => assert_eq!(v, "0.2.0"),
            other => panic!("expected UnsupportedVersion, got {:?}", other.err()),
        }
    }

    #[test]
    fn missing_manifest_is_reported() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("firmware.bin", FileOptions::default())
            .unwrap();
        writer.write_all(&[0u8; 8]).unwrap();
        let reader = Cursor::new(writer.finish().unwrap().into_inner());

        assert!(matches!(
            FlashPackage::from_reader(reader),
            Err(Error::MissingManifest)
        ));
    }

    #[test]
    fn missing_payload_entry_is_reported() {
        let manifest = r#"{
            "version": "0.1.0",
            "files": [ { "address": 0, "bin": "gone.bin" } ]
        }"#;
        let reader = build_package(manifest, &[]);
        let mut package = FlashPackage::from_reader(reader).unwrap();
        let spec = package.files()[0].clone();
        let result = package.open_file(&spec);
        match result {
            Err(Error::MissingEntry(name)) => assert_eq!(name, "gone.bin"),
            other => panic!("expected MissingEntry, got {:?}", other.err()),
        }
    }
}
