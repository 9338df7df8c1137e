//! The entry extraction seam.

use std::io::Read;
use std::io::Seek;

use crate::LoaderConfig;
use crate::Result;

/// Outcome of looking an entry up by name.
///
/// A missing entry is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The entry exists; holds its full decompressed content.
    Found(Vec<u8>),
    /// No entry has that exact name.
    NotFound,
}

impl Extraction {
    /// Returns `true` if the entry was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the entry content, if found.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Found(bytes) => Some(bytes),
            Self::NotFound => None,
        }
    }

    /// Consumes the result and returns the entry content, if found.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Found(bytes) => Some(bytes),
            Self::NotFound => None,
        }
    }
}

/// Looks up one entry in an open archive stream and reads it into memory.
pub trait EntryExtractor {
    /// Finds `entry_name` in the archive read from `archive` and returns its
    /// decompressed bytes.
    ///
    /// The stream may be shared by several lookups; implementations seek
    /// wherever they need to and make no assumption about its position.
    ///
    /// # Errors
    ///
    /// Returns an error only if the archive or a located entry cannot be
    /// read. A missing entry is `Ok(Extraction::NotFound)`.
    fn extract<R: Read + Seek>(
        &self,
        archive: &mut R,
        entry_name: &str,
        config: &LoaderConfig,
    ) -> Result<Extraction>;
}

impl<T: EntryExtractor + ?Sized> EntryExtractor for &T {
    fn extract<R: Read + Seek>(
        &self,
        archive: &mut R,
        entry_name: &str,
        config: &LoaderConfig,
    ) -> Result<Extraction> {
        (**self).extract(archive, entry_name, config)
    }
}
