//! Loading a module and its symbols out of a zip archive.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::LoadError;
use crate::LoaderConfig;
use crate::Result;
use crate::formats::EntryExtractor;
use crate::formats::Extraction;
use crate::formats::ZipEntryExtractor;
use crate::host::DebuggerProbe;
use crate::host::LoadedModule;
use crate::host::ModuleLoader;
use crate::host::ProcessDebugger;
use crate::types::ArchivePath;
use crate::types::PayloadName;

/// Loads modules from zip archives through a host-supplied [`ModuleLoader`].
///
/// Every call opens the archive, scans it for the payload (and, when
/// needed, the symbol entry), closes it and only then hands the bytes to
/// the module loader. Nothing is cached between calls.
///
/// # Examples
///
/// ```no_run
/// use zipload_core::ZipModuleLoader;
/// use zipload_core::host::ImageLoader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = ZipModuleLoader::new(ImageLoader);
/// let module = loader.load_with_symbols("plugins.zip", "Foo.dll", true)?;
/// println!("loaded {}", module.location());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ZipModuleLoader<L, X = ZipEntryExtractor, D = ProcessDebugger> {
    modules: L,
    extractor: X,
    debugger: D,
    config: LoaderConfig,
}

impl<L> ZipModuleLoader<L> {
    /// Creates a loader with the default extractor, debugger probe and
    /// configuration.
    #[must_use]
    pub fn new(modules: L) -> Self {
        Self::builder(modules).build()
    }

    /// Starts building a loader around `modules`.
    #[must_use]
    pub fn builder(modules: L) -> ZipModuleLoaderBuilder<L> {
        ZipModuleLoaderBuilder {
            modules,
            extractor: ZipEntryExtractor::new(),
            debugger: ProcessDebugger,
            config: LoaderConfig::default(),
        }
    }
}

impl<L, X, D> ZipModuleLoader<L, X, D>
where
    L: ModuleLoader,
    X: EntryExtractor,
    D: DebuggerProbe,
{
    /// Returns the loader configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads `entry_name` from the archive without requiring symbols.
    ///
    /// Symbols are still picked up when a debugger is attached and the
    /// symbol entry exists.
    ///
    /// # Errors
    ///
    /// See [`load_with_symbols`](Self::load_with_symbols).
    pub fn load<P: AsRef<Path>>(
        &self,
        archive_path: P,
        entry_name: &str,
    ) -> Result<LoadedModule<L::Module>> {
        self.load_with_symbols(archive_path, entry_name, false)
    }

    /// Loads `entry_name` from the archive, with its symbols if requested.
    ///
    /// Symbols are looked up when `load_symbols` is set or a debugger is
    /// attached. Only an explicit request makes their absence an error.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the archive path is blank or missing, or the
    ///   entry name is blank or lacks the binary extension. No I/O happens.
    /// - `PayloadNotFound` if the archive has no entry named `entry_name`.
    /// - `SymbolsNotFound` if `load_symbols` is set and the derived symbol
    ///   entry is missing.
    /// - An `EntryReadFailure` kind if the archive or an entry cannot be read.
    /// - `ModuleRejected` if the module loader refuses the bytes.
    pub fn load_with_symbols<P: AsRef<Path>>(
        &self,
        archive_path: P,
        entry_name: &str,
        load_symbols: bool,
    ) -> Result<LoadedModule<L::Module>> {
        let archive = ArchivePath::new(archive_path)?;
        let payload = PayloadName::new(entry_name, &self.config)?;

        // read once: the same answer drives both the lookup and the loader call
        let debugger_attached = self.debugger.is_attached();
        let want_symbols = load_symbols || debugger_attached;

        debug!(
            archive = %archive.as_path().display(),
            entry = %payload,
            load_symbols,
            debugger_attached,
            "loading module from archive"
        );

        let (image, symbols) = self.read_entries(&archive, &payload, want_symbols)?;

        let Some(image) = image.into_bytes() else {
            return Err(LoadError::PayloadNotFound {
                archive: archive.as_path().to_path_buf(),
                entry: payload.as_str().to_string(),
            });
        };

        let symbols = symbols.and_then(Extraction::into_bytes);
        if load_symbols && symbols.is_none() {
            return Err(LoadError::SymbolsNotFound {
                archive: archive.as_path().to_path_buf(),
                entry: payload.symbol_name().to_string(),
            });
        }

        debug!(
            entry = %payload,
            bytes = image.len(),
            symbols = symbols.as_ref().map_or(0, Vec::len),
            "handing module to loader"
        );

        let module = match symbols {
            Some(symbols) if want_symbols => self.modules.load_with_symbols(image, symbols),
            _ => self.modules.load(image),
        }
        .map_err(|source| LoadError::ModuleRejected {
            entry: payload.as_str().to_string(),
            source,
        })?;

        Ok(LoadedModule::new(module, archive.location(payload.as_str())))
    }

    /// Opens the archive, extracts the payload and optionally the symbols.
    ///
    /// The archive is closed when this returns, on success and on error.
    fn read_entries(
        &self,
        archive: &ArchivePath,
        payload: &PayloadName,
        want_symbols: bool,
    ) -> Result<(Extraction, Option<Extraction>)> {
        let mut reader = BufReader::new(File::open(archive.as_path())?);

        let image = self
            .extractor
            .extract(&mut reader, payload.as_str(), &self.config)?;

        let symbols = if want_symbols {
            Some(
                self.extractor
                    .extract(&mut reader, payload.symbol_name(), &self.config)?,
            )
        } else {
            None
        };

        Ok((image, symbols))
    }
}

/// Builder for [`ZipModuleLoader`].
///
/// # Examples
///
/// ```
/// use zipload_core::{LoaderConfig, ZipModuleLoader};
/// use zipload_core::host::{ImageLoader, NoDebugger};
///
/// let loader = ZipModuleLoader::builder(ImageLoader)
///     .debugger(NoDebugger)
///     .config(LoaderConfig::legacy())
///     .build();
/// assert_eq!(loader.config(), &LoaderConfig::legacy());
/// ```
#[derive(Debug)]
pub struct ZipModuleLoaderBuilder<L, X = ZipEntryExtractor, D = ProcessDebugger> {
    modules: L,
    extractor: X,
    debugger: D,
    config: LoaderConfig,
}

impl<L, X, D> ZipModuleLoaderBuilder<L, X, D> {
    /// Replaces the entry extractor.
    #[must_use]
    pub fn extractor<X2>(self, extractor: X2) -> ZipModuleLoaderBuilder<L, X2, D> {
        ZipModuleLoaderBuilder {
            modules: self.modules,
            extractor,
            debugger: self.debugger,
            config: self.config,
        }
    }

    /// Replaces the debugger probe.
    #[must_use]
    pub fn debugger<D2>(self, debugger: D2) -> ZipModuleLoaderBuilder<L, X, D2> {
        ZipModuleLoaderBuilder {
            modules: self.modules,
            extractor: self.extractor,
            debugger,
            config: self.config,
        }
    }

    /// Sets the loader configuration.
    #[must_use]
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the loader.
    #[must_use]
    pub fn build(self) -> ZipModuleLoader<L, X, D> {
        ZipModuleLoader {
            modules: self.modules,
            extractor: self.extractor,
            debugger: self.debugger,
            config: self.config,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::error::BoxError;
    use crate::host::NoDebugger;
    use crate::test_utils::CountingExtractor;
    use crate::test_utils::LoaderCall;
    use crate::test_utils::RecordingLoader;
    use crate::test_utils::ZipTestBuilder;
    use crate::test_utils::rename_entry;
    use std::cell::Cell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_archive(temp: &TempDir, builder: ZipTestBuilder) -> PathBuf {
        let path = temp.path().join("lib.zip");
        builder.write_to(&path);
        path
    }

    fn payload_and_symbols() -> ZipTestBuilder {
        ZipTestBuilder::new()
            .add_file("Foo.dll", &[0xAA; 10])
            .add_file("Foo.pdb", &[0xBB; 5])
    }

    fn payload_only() -> ZipTestBuilder {
        ZipTestBuilder::new().add_file("Foo.dll", &[0xAA; 10])
    }

    #[test]
    fn test_loads_payload_and_symbols() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_and_symbols());
        let modules = RecordingLoader::new();
        let loader = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .build();

        let loaded = loader.load_with_symbols(&path, "Foo.dll", true).unwrap();

        assert_eq!(
            modules.calls(),
            vec![LoaderCall::ImageWithSymbols(vec![0xAA; 10], vec![0xBB; 5])]
        );
        assert_eq!(
            loaded.location(),
            format!("{}{}Foo.dll", path.display(), std::path::MAIN_SEPARATOR)
        );
    }

    #[test]
    fn test_missing_payload() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, ZipTestBuilder::new().add_file("Bar.dll", b"bar"));
        let modules = RecordingLoader::new();
        let loader = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .build();

        let err = loader.load(&path, "Foo.dll").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PayloadNotFound);
        assert_eq!(err.entry_name(), Some("Foo.dll"));
        assert!(modules.calls().is_empty());
    }

    #[test]
    fn test_missing_payload_reported_before_missing_symbols() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, ZipTestBuilder::new().add_file("Bar.dll", b"bar"));
        let loader = ZipModuleLoader::builder(RecordingLoader::new())
            .debugger(NoDebugger)
            .build();

        let err = loader.load_with_symbols(&path, "Foo.dll", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadNotFound);
    }

    #[test]
    fn test_requested_symbols_missing() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_only());
        let modules = RecordingLoader::new();
        let loader = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .build();

        let err = loader.load_with_symbols(&path, "Foo.dll", true).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SymbolsNotFound);
        assert_eq!(err.entry_name(), Some("Foo.pdb"));
        assert!(modules.calls().is_empty());
    }

    #[test]
    fn test_symbols_not_looked_up_without_request_or_debugger() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_and_symbols());
        let modules = RecordingLoader::new();
        let extractor = CountingExtractor::new();
        let loader = ZipModuleLoader::builder(&modules)
            .extractor(&extractor)
            .debugger(NoDebugger)
            .build();

        loader.load(&path, "Foo.dll").unwrap();

        assert_eq!(extractor.lookups(), vec!["Foo.dll".to_string()]);
        assert_eq!(modules.calls(), vec![LoaderCall::Image(vec![0xAA; 10])]);
    }

    #[test]
    fn test_debugger_pulls_in_symbols() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_and_symbols());
        let modules = RecordingLoader::new();
        let extractor = CountingExtractor::new();
        let loader = ZipModuleLoader::builder(&modules)
            .extractor(&extractor)
            .debugger(|| true)
            .build();

        loader.load(&path, "Foo.dll").unwrap();

        assert_eq!(extractor.lookups(), vec!["Foo.dll", "Foo.pdb"]);
        assert_eq!(
            modules.calls(),
            vec![LoaderCall::ImageWithSymbols(vec![0xAA; 10], vec![0xBB; 5])]
        );
    }

    #[test]
    fn test_debugger_tolerates_missing_symbols() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_only());
        let modules = RecordingLoader::new();
        let extractor = CountingExtractor::new();
        let loader = ZipModuleLoader::builder(&modules)
            .extractor(&extractor)
            .debugger(|| true)
            .build();

        let loaded = loader.load(&path, "Foo.dll").unwrap();

        assert_eq!(extractor.count(), 2);
        assert_eq!(modules.calls(), vec![LoaderCall::Image(vec![0xAA; 10])]);
        assert!(!loaded.module().has_symbols());
    }

    #[test]
    fn test_debugger_probe_read_once_per_call() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_and_symbols());
        let reads = Cell::new(0);
        let probe = || {
            reads.set(reads.get() + 1);
            // flips on every read; a second read would disagree with the first
            reads.get() % 2 == 1
        };
        let modules = RecordingLoader::new();
        let loader = ZipModuleLoader::builder(&modules).debugger(probe).build();

        loader.load(&path, "Foo.dll").unwrap();

        assert_eq!(reads.get(), 1);
        assert_eq!(
            modules.calls(),
            vec![LoaderCall::ImageWithSymbols(vec![0xAA; 10], vec![0xBB; 5])]
        );
    }

    #[test]
    fn test_validation_happens_before_probe_and_io() {
        let temp = TempDir::new().unwrap();
        let extractor = CountingExtractor::new();
        let reads = Cell::new(0);
        let loader = ZipModuleLoader::builder(RecordingLoader::new())
            .extractor(&extractor)
            .debugger(|| {
                reads.set(reads.get() + 1);
                false
            })
            .build();

        let missing = temp.path().join("missing.zip");
        let err = loader.load(&missing, "Foo.dll").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let path = write_archive(&temp, payload_only());
        let err = loader.load(&path, "Foo.exe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = loader.load(&path, "  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(extractor.count(), 0);
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn test_not_a_zip_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lib.zip");
        std::fs::write(&path, b"definitely not a zip file").unwrap();
        let loader = ZipModuleLoader::builder(RecordingLoader::new())
            .debugger(NoDebugger)
            .build();

        let err = loader.load(&path, "Foo.dll").unwrap_err();
        assert!(matches!(err, LoadError::InvalidArchive { .. }));
        assert_eq!(err.kind(), ErrorKind::EntryReadFailure);
    }

    #[test]
    fn test_module_loader_rejection() {
        struct Rejecting;

        impl ModuleLoader for Rejecting {
            type Module = ();

            fn load(&self, _image: Vec<u8>) -> std::result::Result<(), BoxError> {
                Err("bad image format".into())
            }

            fn load_with_symbols(
                &self,
                _image: Vec<u8>,
                _symbols: Vec<u8>,
            ) -> std::result::Result<(), BoxError> {
                Err("bad image format".into())
            }
        }

        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_only());
        let loader = ZipModuleLoader::builder(Rejecting)
            .debugger(NoDebugger)
            .build();

        let err = loader.load(&path, "Foo.dll").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleRejected);
        assert!(err.to_string().contains("bad image format"));
    }

    #[test]
    fn test_legacy_symbol_naming() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(
            &temp,
            ZipTestBuilder::new()
                .add_file("dllLoader.dll", b"payload")
                .add_file("pdbLoader.pdb", b"legacy")
                .add_file("dllLoader.pdb", b"suffix"),
        );

        let modules = RecordingLoader::new();
        let legacy = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .config(LoaderConfig::legacy())
            .build();
        legacy.load_with_symbols(&path, "dllLoader.dll", true).unwrap();

        let suffix = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .build();
        suffix.load_with_symbols(&path, "dllLoader.dll", true).unwrap();

        assert_eq!(
            modules.calls(),
            vec![
                LoaderCall::ImageWithSymbols(b"payload".to_vec(), b"legacy".to_vec()),
                LoaderCall::ImageWithSymbols(b"payload".to_vec(), b"suffix".to_vec()),
            ]
        );
    }

    #[test]
    fn test_duplicated_payload_and_symbols_use_first_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lib.zip");
        let mut data = ZipTestBuilder::new()
            .add_file("Foo.dll", b"FIRST")
            .add_file("Foo.pdb", b"first symbols")
            .add_file("Goo.dll", b"SECND")
            .add_file("Goo.pdb", b"later symbols")
            .build();
        rename_entry(&mut data, "Goo.", "Foo.");
        std::fs::write(&path, data).unwrap();
        let modules = RecordingLoader::new();
        let loader = ZipModuleLoader::builder(&modules)
            .debugger(NoDebugger)
            .build();

        loader.load_with_symbols(&path, "Foo.dll", true).unwrap();

        assert_eq!(
            modules.calls(),
            vec![LoaderCall::ImageWithSymbols(
                b"FIRST".to_vec(),
                b"first symbols".to_vec()
            )]
        );
    }

    #[test]
    fn test_oversized_payload() {
        let temp = TempDir::new().unwrap();
        let path = write_archive(&temp, payload_only());
        let loader = ZipModuleLoader::builder(RecordingLoader::new())
            .debugger(NoDebugger)
            .config(LoaderConfig {
                max_entry_size: 4,
                ..LoaderConfig::default()
            })
            .build();

        let err = loader.load(&path, "Foo.dll").unwrap_err();
        assert!(matches!(err, LoadError::EntryTooLarge { size: 10, max: 4, .. }));
    }
}
