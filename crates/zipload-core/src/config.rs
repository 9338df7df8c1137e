//! Loader configuration.

/// How the symbol entry name is derived from the payload entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolNaming {
    /// Replace only the trailing binary extension.
    ///
    /// `"bin/dllLoader.dll"` becomes `"bin/dllLoader.pdb"`.
    #[default]
    Suffix,

    /// Replace every occurrence of the bare extension text, anywhere in the name.
    ///
    /// `"bin/dllLoader.dll"` becomes `"bin/pdbLoader.pdb"`. This is what older
    /// releases of the zip assembly loader did; keep it only for archives that
    /// were packaged against that rule.
    Literal,
}

/// Configuration for [`ZipModuleLoader`](crate::ZipModuleLoader).
///
/// # Examples
///
/// ```
/// use zipload_core::{LoaderConfig, SymbolNaming};
///
/// // `.dll` payloads with `.pdb` symbols
/// let config = LoaderConfig::default();
/// assert_eq!(config.binary_extension, ".dll");
///
/// // Shared objects with split debug info
/// let custom = LoaderConfig {
///     binary_extension: ".so".to_string(),
///     symbol_extension: ".debug".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(custom.symbol_naming, SymbolNaming::Suffix);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Extension every payload entry name must end with, including the dot.
    pub binary_extension: String,

    /// Extension of the companion symbol entry, including the dot.
    pub symbol_extension: String,

    /// Rule used to derive the symbol entry name.
    pub symbol_naming: SymbolNaming,

    /// Maximum decompressed size of a single entry in bytes.
    pub max_entry_size: u64,
}

impl Default for LoaderConfig {
    /// Default values:
    /// - `binary_extension`: `".dll"`
    /// - `symbol_extension`: `".pdb"`
    /// - `symbol_naming`: [`SymbolNaming::Suffix`]
    /// - `max_entry_size`: 256 MB
    fn default() -> Self {
        Self {
            binary_extension: ".dll".to_string(),
            symbol_extension: ".pdb".to_string(),
            symbol_naming: SymbolNaming::Suffix,
            max_entry_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl LoaderConfig {
    /// Default configuration with [`SymbolNaming::Literal`] symbol names.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            symbol_naming: SymbolNaming::Literal,
            ..Self::default()
        }
    }
}
