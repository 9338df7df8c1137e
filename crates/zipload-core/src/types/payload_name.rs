//! Validated payload entry name and symbol name derivation.

use crate::LoadError;
use crate::LoaderConfig;
use crate::Result;
use crate::SymbolNaming;

/// Name of a payload entry, validated against a [`LoaderConfig`].
///
/// Carries the companion symbol entry name, derived once at validation time
/// using the configured [`SymbolNaming`] rule. The derivation is textual and
/// does not interpret `/` separators.
///
/// # Examples
///
/// ```
/// use zipload_core::LoaderConfig;
/// use zipload_core::types::PayloadName;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let name = PayloadName::new("Foo.dll", &LoaderConfig::default())?;
/// assert_eq!(name.symbol_name(), "Foo.pdb");
///
/// // Names without the binary extension are rejected
/// assert!(PayloadName::new("Foo.exe", &LoaderConfig::default()).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadName {
    name: String,
    symbols: String,
}

impl PayloadName {
    /// Validates `name` and derives its symbol entry name.
    ///
    /// The extension is checked before derivation: suffix replacement is
    /// only meaningful for a name that ends with the binary extension.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidArgument` if the name is blank, if the
    /// configured binary extension is empty, or if the name does not end
    /// with the binary extension (case-sensitive).
    pub fn new(name: &str, config: &LoaderConfig) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(LoadError::invalid_argument(
                "entry_name",
                "is not allowed to be empty",
            ));
        }

        if config.binary_extension.is_empty() {
            return Err(LoadError::invalid_argument(
                "binary_extension",
                "is not allowed to be empty",
            ));
        }

        if !name.ends_with(&config.binary_extension) {
            return Err(LoadError::invalid_argument(
                "entry_name",
                format!(
                    "must end with '{}' to be a valid module name",
                    config.binary_extension
                ),
            ));
        }

        let symbols = derive_symbol_name(
            name,
            &config.binary_extension,
            &config.symbol_extension,
            config.symbol_naming,
        );

        Ok(Self {
            name: name.to_string(),
            symbols,
        })
    }

    /// Returns the payload entry name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the derived symbol entry name.
    #[must_use]
    pub fn symbol_name(&self) -> &str {
        &self.symbols
    }
}

impl std::fmt::Display for PayloadName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Derives a symbol entry name from a payload entry name.
///
/// `name` must already end with `binary_ext`.
fn derive_symbol_name(
    name: &str,
    binary_ext: &str,
    symbol_ext: &str,
    naming: SymbolNaming,
) -> String {
    match naming {
        SymbolNaming::Suffix => {
            let stem = &name[..name.len() - binary_ext.len()];
            format!("{stem}{symbol_ext}")
        }
        SymbolNaming::Literal => {
            let bare_binary = binary_ext.trim_start_matches('.');
            let bare_symbol = symbol_ext.trim_start_matches('.');
            if bare_binary.is_empty() {
                // an extension of only dots has no text to replace
                return derive_symbol_name(name, binary_ext, symbol_ext, SymbolNaming::Suffix);
            }
            name.replace(bare_binary, bare_symbol)
        }
    }
}
