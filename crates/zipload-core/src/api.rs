//! High-level public API for loading modules from archives.

use std::path::Path;

use crate::Result;
use crate::ZipModuleLoader;
use crate::host::ImageLoader;
use crate::host::LoadedModule;
use crate::host::ModuleImage;

/// Loads a module image from a zip archive.
///
/// Shorthand for [`load_from_archive_with_symbols`] with `load_symbols`
/// set to `false`.
///
/// # Errors
///
/// See [`ZipModuleLoader::load_with_symbols`].
///
/// # Examples
///
/// ```no_run
/// use zipload_core::load_from_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let module = load_from_archive("plugins.zip", "Foo.dll")?;
/// println!("{}: {} bytes", module.location(), module.module().image.len());
/// # Ok(())
/// # }
/// ```
pub fn load_from_archive<P: AsRef<Path>>(
    archive_path: P,
    entry_name: &str,
) -> Result<LoadedModule<ModuleImage>> {
    load_from_archive_with_symbols(archive_path, entry_name, false)
}

/// Loads a module image, and its symbols if requested, from a zip archive.
///
/// Uses `.dll`/`.pdb` naming, the process debugger probe and the raw
/// [`ImageLoader`]. Build a [`ZipModuleLoader`] for anything else.
///
/// # Errors
///
/// See [`ZipModuleLoader::load_with_symbols`].
///
/// # Examples
///
/// ```no_run
/// use zipload_core::load_from_archive_with_symbols;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let module = load_from_archive_with_symbols("plugins.zip", "Foo.dll", true)?;
/// assert!(module.module().has_symbols());
/// # Ok(())
/// # }
/// ```
pub fn load_from_archive_with_symbols<P: AsRef<Path>>(
    archive_path: P,
    entry_name: &str,
    load_symbols: bool,
) -> Result<LoadedModule<ModuleImage>> {
    ZipModuleLoader::new(ImageLoader).load_with_symbols(archive_path, entry_name, load_symbols)
}
