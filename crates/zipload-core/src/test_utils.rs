//! Zip fixtures for tests and benchmarks.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::cell::RefCell;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

use crate::LoaderConfig;
use crate::Result;
use crate::error::BoxError;
use crate::formats::EntryExtractor;
use crate::formats::Extraction;
use crate::formats::ZipEntryExtractor;
use crate::host::ImageLoader;
use crate::host::ModuleImage;
use crate::host::ModuleLoader;

/// Creates an in-memory ZIP archive of stored (uncompressed) entries.
///
/// Each entry is a tuple of (name, content).
///
/// # Examples
///
/// ```
/// use zipload_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("Foo.dll", b"payload"), ("Foo.pdb", b"symbols")]);
/// assert!(!zip_data.is_empty());
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(ZipTestBuilder::new(), |builder, (name, data)| {
            builder.add_file(name, data)
        })
        .build()
}

/// Builder for ZIP test archives.
///
/// # Examples
///
/// ```
/// use zipload_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .add_directory("bin/")
///     .add_file("bin/Foo.dll", b"payload")
///     .add_deflated("bin/Foo.pdb", b"symbols")
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds an uncompressed file.
    #[must_use]
    pub fn add_file(self, name: &str, data: &[u8]) -> Self {
        self.add_with_method(name, data, zip::CompressionMethod::Stored)
    }

    /// Adds a deflate-compressed file.
    #[must_use]
    pub fn add_deflated(self, name: &str, data: &[u8]) -> Self {
        self.add_with_method(name, data, zip::CompressionMethod::Deflated)
    }

    fn add_with_method(mut self, name: &str, data: &[u8], method: zip::CompressionMethod) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .unix_permissions(0o644);

        self.zip.start_file(name, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory entry.
    #[must_use]
    pub fn add_directory(mut self, name: &str) -> Self {
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(name, options).unwrap();
        self
    }

    /// Builds and returns the ZIP archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }

    /// Builds the archive and writes it to `path`.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flips one byte of the first occurrence of `needle` in `data`.
///
/// Used to corrupt the stored content of an entry so that reading it fails
/// its CRC check while the archive structure stays intact.
pub fn corrupt_content(data: &mut [u8], needle: &[u8]) {
    let position = data
        .windows(needle.len())
        .position(|window| window == needle)
        .unwrap();
    data[position] ^= 0xFF;
}

/// Renames every occurrence of entry name `from` to `to` in raw archive bytes.
///
/// Both names must have the same length so that no offset moves. Renaming
/// one entry to another's name yields an archive with a duplicated name,
/// which zip writers refuse to produce directly.
pub fn rename_entry(data: &mut [u8], from: &str, to: &str) {
    assert_eq!(from.len(), to.len(), "names must have the same length");
    let (from, to) = (from.as_bytes(), to.as_bytes());

    let mut position = 0;
    while let Some(offset) = data[position..]
        .windows(from.len())
        .position(|window| window == from)
    {
        let start = position + offset;
        data[start..start + from.len()].copy_from_slice(to);
        position = start + from.len();
    }
}

/// Extractor that records every lookup before delegating to [`ZipEntryExtractor`].
#[derive(Debug, Default)]
pub struct CountingExtractor {
    lookups: RefCell<Vec<String>>,
}

impl CountingExtractor {
    /// Creates a new counting extractor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of lookups made so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lookups.borrow().len()
    }

    /// Returns the entry names looked up, in order.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }
}

impl EntryExtractor for CountingExtractor {
    fn extract<R: Read + Seek>(
        &self,
        archive: &mut R,
        entry_name: &str,
        config: &LoaderConfig,
    ) -> Result<Extraction> {
        self.lookups.borrow_mut().push(entry_name.to_string());
        ZipEntryExtractor::new().extract(archive, entry_name, config)
    }
}

/// A call received by [`RecordingLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    /// `load(image)`
    Image(Vec<u8>),
    /// `load_with_symbols(image, symbols)`
    ImageWithSymbols(Vec<u8>, Vec<u8>),
}

/// Module loader that records the buffers it receives.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    calls: RefCell<Vec<LoaderCall>>,
}

impl RecordingLoader {
    /// Creates a new recording loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<LoaderCall> {
        self.calls.borrow().clone()
    }
}

impl ModuleLoader for RecordingLoader {
    type Module = ModuleImage;

    fn load(&self, image: Vec<u8>) -> std::result::Result<ModuleImage, BoxError> {
        self.calls.borrow_mut().push(LoaderCall::Image(image.clone()));
        ImageLoader.load(image)
    }

    fn load_with_symbols(
        &self,
        image: Vec<u8>,
        symbols: Vec<u8>,
    ) -> std::result::Result<ModuleImage, BoxError> {
        self.calls
            .borrow_mut()
            .push(LoaderCall::ImageWithSymbols(image.clone(), symbols.clone()));
        ImageLoader.load_with_symbols(image, symbols)
    }
}
