//! Load binary modules and their debug symbols straight out of zip archives.
//!
//! `zipload-core` finds a payload entry by exact name in a zip archive,
//! reads it into memory together with its companion symbol entry when
//! needed, and hands the bytes to a host-supplied [`ModuleLoader`]. The
//! archive is opened and closed within each call and never written to disk.
//!
//! Symbols are looked up when the caller asks for them or when a debugger is
//! attached; only an explicit request makes a missing symbol entry an error.
//!
//! # Examples
//!
//! ```no_run
//! use zipload_core::load_from_archive_with_symbols;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let module = load_from_archive_with_symbols("plugins.zip", "Foo.dll", true)?;
//! println!("loaded {}", module.location());
//! # Ok(())
//! # }
//! ```
//!
//! [`ModuleLoader`]: host::ModuleLoader

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod formats;
pub mod host;
pub mod loader;
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use api::load_from_archive;
pub use api::load_from_archive_with_symbols;
pub use config::LoaderConfig;
pub use config::SymbolNaming;
pub use error::ErrorKind;
pub use error::LoadError;
pub use error::Result;
pub use host::LoadedModule;
pub use host::ModuleImage;
pub use loader::ZipModuleLoader;
pub use loader::ZipModuleLoaderBuilder;
