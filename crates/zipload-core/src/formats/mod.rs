//! Locating and reading entries inside archives.

pub mod traits;
pub mod zip;

// Re-export main types for convenience
pub use traits::EntryExtractor;
pub use traits::Extraction;
pub use self::zip::ZipEntryExtractor;
