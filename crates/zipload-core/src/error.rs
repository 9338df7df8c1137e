//! Error types for loading modules out of zip archives.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `LoadError`.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Boxed error produced by an external module loader.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`LoadError`].
///
/// Callers branch on the kind rather than on individual variants; several
/// variants share a kind when they only differ in the detail they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument was rejected before any I/O took place.
    InvalidArgument,
    /// The payload entry does not exist in the archive.
    PayloadNotFound,
    /// Symbols were explicitly requested but the symbol entry does not exist.
    SymbolsNotFound,
    /// The archive or a located entry could not be read.
    EntryReadFailure,
    /// The external module loader refused the payload.
    ModuleRejected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::PayloadNotFound => "payload not found",
            Self::SymbolsNotFound => "symbols not found",
            Self::EntryReadFailure => "entry read failure",
            Self::ModuleRejected => "module rejected",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading a module from an archive.
#[derive(Error, Debug)]
pub enum LoadError {
    /// An input failed validation.
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        param: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The requested payload entry is not in the archive.
    #[error("payload `{entry}` not found in {}", archive.display())]
    PayloadNotFound {
        /// Archive that was scanned.
        archive: PathBuf,
        /// Entry name that was looked up.
        entry: String,
    },

    /// Symbols were requested but the derived symbol entry is not in the archive.
    #[error("symbols `{entry}` not found in {}", archive.display())]
    SymbolsNotFound {
        /// Archive that was scanned.
        archive: PathBuf,
        /// Derived symbol entry name that was looked up.
        entry: String,
    },

    /// The archive's central directory could not be parsed.
    #[error("invalid zip archive: {reason}")]
    InvalidArchive {
        /// Description from the zip reader.
        reason: String,
    },

    /// A located entry could not be decompressed.
    #[error("failed to read entry `{entry}`: {source}")]
    EntryRead {
        /// Entry being read.
        entry: String,
        /// Underlying I/O failure (corruption, truncation, CRC mismatch).
        #[source]
        source: std::io::Error,
    },

    /// A located entry is larger than the configured limit.
    #[error("entry `{entry}` is too large ({size} > {max} bytes)")]
    EntryTooLarge {
        /// Entry being read.
        entry: String,
        /// Size declared by the archive or observed while copying.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external module loader refused the bytes.
    #[error("module loader rejected `{entry}`: {source}")]
    ModuleRejected {
        /// Payload entry that was handed to the loader.
        entry: String,
        /// Error reported by the loader.
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    /// Returns the kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipload_core::{ErrorKind, LoadError};
    ///
    /// let err = LoadError::PayloadNotFound {
    ///     archive: "lib.zip".into(),
    ///     entry: "Foo.dll".to_string(),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::PayloadNotFound);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::PayloadNotFound { .. } => ErrorKind::PayloadNotFound,
            Self::SymbolsNotFound { .. } => ErrorKind::SymbolsNotFound,
            Self::InvalidArchive { .. }
            | Self::EntryRead { .. }
            | Self::EntryTooLarge { .. }
            | Self::Io(_) => ErrorKind::EntryReadFailure,
            Self::ModuleRejected { .. } => ErrorKind::ModuleRejected,
        }
    }

    /// Returns `true` if a payload or symbol entry was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PayloadNotFound { .. } | Self::SymbolsNotFound { .. }
        )
    }

    /// Returns the archive entry this error is about, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipload_core::LoadError;
    ///
    /// let err = LoadError::SymbolsNotFound {
    ///     archive: "lib.zip".into(),
    ///     entry: "Foo.pdb".to_string(),
    /// };
    /// assert_eq!(err.entry_name(), Some("Foo.pdb"));
    /// ```
    #[must_use]
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::PayloadNotFound { entry, .. }
            | Self::SymbolsNotFound { entry, .. }
            | Self::EntryRead { entry, .. }
            | Self::EntryTooLarge { entry, .. }
            | Self::ModuleRejected { entry, .. } => Some(entry),
            Self::InvalidArgument { .. } | Self::InvalidArchive { .. } | Self::Io(_) => None,
        }
    }

    pub(crate) fn invalid_argument(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }
}
