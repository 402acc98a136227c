//! Turning a module file into a live instance
//!
//! [`NativeLoader`] maps the shared library and calls the constructor found
//! in its exported declaration. [`StaticLoader`] serves modules linked into
//! the host binary and never touches the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use modhost_abi::{declaration_symbol, normalize_name, Module, ModuleDeclaration};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("library does not export '{symbol}'")]
    MissingSymbol { symbol: String },

    #[error("module ABI version {found} does not match host ABI version {expected}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("module built by '{found}' but host built by '{expected}'")]
    CompilerMismatch { expected: String, found: String },

    #[error("no statically linked module named '{0}'")]
    NotLinked(String),
}

/// Keeps a module's code mapped for as long as its instance lives
#[derive(Debug)]
pub enum LibraryHandle {
    Native(libloading::Library),
    /// Code is part of the host binary
    Static,
}

impl LibraryHandle {
    /// Unmap the library. Every object created from it must already be gone.
    pub fn release(self) {
        match self {
            LibraryHandle::Native(library) => {
                if let Err(e) = library.close() {
                    warn!("Failed to close module library: {}", e);
                }
            }
            LibraryHandle::Static => {}
        }
    }

    /// Keep the library mapped for the rest of the process.
    pub fn leak(self) {
        if let LibraryHandle::Native(library) = self {
            std::mem::forget(library);
        }
    }
}

/// A freshly constructed instance and the code backing it
pub struct LoadedLibrary {
    pub instance: Box<dyn Module>,
    pub library: LibraryHandle,
}

impl std::fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("instance", &self.instance)
            .field("library", &self.library)
            .finish()
    }
}

pub trait ModuleLoader {
    /// Construct the entry object of module `name` from the file at `path`.
    fn load(&self, name: &str, path: &Path) -> Result<LoadedLibrary, LoadError>;
}

fn check_declaration(declaration: &ModuleDeclaration) -> Result<(), LoadError> {
    if declaration.abi_version != modhost_abi::ABI_VERSION {
        return Err(LoadError::AbiMismatch {
            expected: modhost_abi::ABI_VERSION,
            found: declaration.abi_version,
        });
    }
    if declaration.rustc_version != modhost_abi::RUSTC_VERSION {
        return Err(LoadError::CompilerMismatch {
            expected: modhost_abi::RUSTC_VERSION.to_string(),
            found: declaration.rustc_version.to_string(),
        });
    }
    Ok(())
}

/// Loads modules from shared libraries on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        NativeLoader
    }

    #[cfg(unix)]
    #[expect(unsafe_code)]
    fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
        use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};

        // Resolve everything up front and keep module symbols private to the module
        let library = unsafe { Library::open(Some(path), RTLD_NOW | RTLD_LOCAL)? };
        Ok(library.into())
    }

    #[cfg(windows)]
    #[expect(unsafe_code)]
    fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
        unsafe { libloading::Library::new(path) }
    }

    /// Read the exported declaration, checking the ABI version before the rest.
    #[expect(unsafe_code)]
    fn declaration(
        library: &libloading::Library,
        symbol: &[u8],
    ) -> Result<ModuleDeclaration, LoadError> {
        let missing = || LoadError::MissingSymbol {
            symbol: String::from_utf8_lossy(symbol.strip_suffix(&[0]).unwrap_or(symbol))
                .into_owned(),
        };

        let pointer: *const ModuleDeclaration = unsafe {
            let exported: libloading::Symbol<'_, *const ModuleDeclaration> =
                library.get(symbol).map_err(|_| missing())?;
            *exported
        };
        if pointer.is_null() {
            return Err(missing());
        }

        // `abi_version` is the first field of a repr(C) struct, so it can be
        // read even when the rest of the layout differs.
        let abi_version = unsafe { std::ptr::addr_of!((*pointer).abi_version).read() };
        if abi_version != modhost_abi::ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                expected: modhost_abi::ABI_VERSION,
                found: abi_version,
            });
        }

        let declaration = unsafe { *pointer };
        check_declaration(&declaration)?;
        Ok(declaration)
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, name: &str, path: &Path) -> Result<LoadedLibrary, LoadError> {
        debug!("Opening module library {}", path.display());
        let library = Self::open(path).map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let declaration = Self::declaration(&library, &declaration_symbol(name))?;
        let instance = (declaration.create)();
        Ok(LoadedLibrary {
            instance,
            library: LibraryHandle::Native(library),
        })
    }
}

/// Serves modules that are linked into the host binary
#[derive(Debug, Default, Clone)]
pub struct StaticLoader {
    declarations: HashMap<String, ModuleDeclaration>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the module declared by `declaration` loadable under `name`.
    pub fn with(mut self, name: &str, declaration: &ModuleDeclaration) -> Self {
        self.register(name, declaration);
        self
    }

    pub fn register(&mut self, name: &str, declaration: &ModuleDeclaration) {
        self.declarations.insert(normalize_name(name), *declaration);
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, name: &str, path: &Path) -> Result<LoadedLibrary, LoadError> {
        let declaration = self
            .declarations
            .get(&normalize_name(name))
            .ok_or_else(|| LoadError::NotLinked(name.to_string()))?;
        check_declaration(declaration)?;

        debug!("Instantiating linked module '{}' for {}", name, path.display());
        Ok(LoadedLibrary {
            instance: (declaration.create)(),
            library: LibraryHandle::Static,
        })
    }
}
