//! The external module-loading facility and the handle it produces.

use crate::error::BoxError;

/// Turns payload bytes, optionally with symbol bytes, into a loaded module.
///
/// Implementations own all knowledge of the binary format. The loader only
/// supplies the byte buffers exactly as stored in the archive.
///
/// # Examples
///
/// ```
/// use zipload_core::error::BoxError;
/// use zipload_core::host::ModuleLoader;
///
/// struct SizeOnly;
///
/// impl ModuleLoader for SizeOnly {
///     type Module = usize;
///
///     fn load(&self, image: Vec<u8>) -> Result<usize, BoxError> {
///         Ok(image.len())
///     }
///
///     fn load_with_symbols(&self, image: Vec<u8>, symbols: Vec<u8>) -> Result<usize, BoxError> {
///         Ok(image.len() + symbols.len())
///     }
/// }
///
/// assert_eq!(SizeOnly.load(vec![0; 4]).unwrap(), 4);
/// ```
pub trait ModuleLoader {
    /// The loaded module type.
    type Module;

    /// Loads a module from its image bytes.
    ///
    /// # Errors
    ///
    /// Returns the facility's own error if it rejects the image.
    fn load(&self, image: Vec<u8>) -> Result<Self::Module, BoxError>;

    /// Loads a module from its image bytes and its debug symbols.
    ///
    /// # Errors
    ///
    /// Returns the facility's own error if it rejects the image or symbols.
    fn load_with_symbols(&self, image: Vec<u8>, symbols: Vec<u8>)
    -> Result<Self::Module, BoxError>;
}

impl<T: ModuleLoader + ?Sized> ModuleLoader for &T {
    type Module = T::Module;

    fn load(&self, image: Vec<u8>) -> Result<Self::Module, BoxError> {
        (**self).load(image)
    }

    fn load_with_symbols(
        &self,
        image: Vec<u8>,
        symbols: Vec<u8>,
    ) -> Result<Self::Module, BoxError> {
        (**self).load_with_symbols(image, symbols)
    }
}

/// Raw module bytes as they came out of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    /// Payload bytes.
    pub image: Vec<u8>,
    /// Symbol bytes, if they were loaded.
    pub symbols: Option<Vec<u8>>,
}

impl ModuleImage {
    /// Returns `true` if symbols were loaded alongside the image.
    #[must_use]
    pub const fn has_symbols(&self) -> bool {
        self.symbols.is_some()
    }
}

/// Module loader that keeps the bytes as a [`ModuleImage`].
///
/// Useful for hosts that map or link modules themselves, and the loader
/// behind [`load_from_archive`](crate::load_from_archive).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl ModuleLoader for ImageLoader {
    type Module = ModuleImage;

    fn load(&self, image: Vec<u8>) -> Result<ModuleImage, BoxError> {
        Ok(ModuleImage {
            image,
            symbols: None,
        })
    }

    fn load_with_symbols(
        &self,
        image: Vec<u8>,
        symbols: Vec<u8>,
    ) -> Result<ModuleImage, BoxError> {
        Ok(ModuleImage {
            image,
            symbols: Some(symbols),
        })
    }
}

/// A module loaded from an archive, stamped with where it came from.
///
/// The location is `archive path + separator + entry name`. It identifies
/// the module in diagnostics and is never opened.
#[derive(Debug, Clone)]
pub struct LoadedModule<M> {
    module: M,
    location: String,
}

impl<M> LoadedModule<M> {
    pub(crate) fn new(module: M, location: String) -> Self {
        Self { module, location }
    }

    /// Returns the location identity of the module.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the module produced by the module loader.
    #[must_use]
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Consumes the handle and returns the module.
    #[must_use]
    pub fn into_module(self) -> M {
        self.module
    }

    /// Consumes the handle and returns the module and its location.
    #[must_use]
    pub fn into_parts(self) -> (M, String) {
        (self.module, self.location)
    }
}
