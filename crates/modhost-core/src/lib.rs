//! Host side of the module system
//!
//! Finds module files, reads their descriptors, loads them on request and
//! exposes the live instances through a [`ModuleRegistry`].

pub mod errors;
pub mod host;
pub mod install;
pub mod introspect;
pub mod loader;
pub mod registry;
pub mod scanner;

#[cfg(test)]
mod testing;

pub use errors::HostError;
pub use host::{CatalogReport, HostHealth, KnownModule, ModuleHost, ModuleStatus};
pub use introspect::{OperationInfo, ParameterInfo};
pub use loader::{LibraryHandle, LoadError, LoadedLibrary, ModuleLoader, NativeLoader, StaticLoader};
pub use registry::ModuleRegistry;
pub use scanner::scan;
