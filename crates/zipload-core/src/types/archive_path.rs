//! Validated archive location.

use crate::LoadError;
use crate::Result;
use std::path::MAIN_SEPARATOR;
use std::path::Path;
use std::path::PathBuf;

/// Path to an archive that existed as a regular file when validated.
///
/// The path is kept exactly as supplied; it is not canonicalized, so
/// [`location`](Self::location) strings read the way the caller wrote them.
///
/// # Examples
///
/// ```no_run
/// use zipload_core::types::ArchivePath;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = ArchivePath::new("plugins/lib.zip")?;
/// assert!(archive.location("Foo.dll").ends_with("Foo.dll"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePath(PathBuf);

impl ArchivePath {
    /// Validates and constructs an `ArchivePath`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidArgument` if the path is blank or does not
    /// name an existing regular file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(LoadError::invalid_argument(
                "archive_path",
                "is not allowed to be empty",
            ));
        }

        if !path.is_file() {
            return Err(LoadError::invalid_argument(
                "archive_path",
                format!("{} does not exist", path.display()),
            ));
        }

        Ok(Self(path.to_path_buf()))
    }

    /// Returns the archive path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Builds the identity string of an entry inside this archive.
    ///
    /// The result is the archive path, the platform separator and the entry
    /// name. It is never used for further I/O.
    #[must_use]
    pub fn location(&self, entry_name: &str) -> String {
        format!("{}{MAIN_SEPARATOR}{entry_name}", self.0.display())
    }
}

impl AsRef<Path> for ArchivePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
