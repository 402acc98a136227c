//! The module host
//!
//! Modules move through `unknown -> known -> loaded -> known`:
//! - [`ModuleHost::process_module`] reads a file's descriptor and catalogs it
//! - [`ModuleHost::load_module`] instantiates a known module and registers it
//! - [`ModuleHost::unload_module`] removes it from the registry and releases its code
//!
//! Declared dependencies are advisory. Loading a module whose dependencies
//! are not loaded succeeds with a warning, and nothing is loaded implicitly.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

use modhost_abi::{normalize_name, DispatchHandle, Dispatcher, InvokeContext, Module};
use modhost_config::HostConfig;
use modhost_descriptor::ModuleDescriptor;

use crate::errors::HostError;
use crate::loader::{LibraryHandle, LoadedLibrary, ModuleLoader, NativeLoader};
use crate::registry::ModuleRegistry;
use crate::scanner;

/// A cataloged module file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownModule {
    /// Registry key (normalized descriptor name)
    pub name: String,
    pub file_path: PathBuf,
    pub descriptor: ModuleDescriptor,
}

struct LoadedModule {
    instance: Rc<dyn Module>,
    library: LibraryHandle,
}

/// One row of [`ModuleHost::list_known`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub name: String,
    pub loaded: bool,
    pub file_path: PathBuf,
    pub descriptor: ModuleDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostHealth {
    Ready,
    /// The managed directory is unusable; installs will fail
    Degraded(String),
}

/// Outcome of [`ModuleHost::discover_and_catalog`]
#[derive(Debug, Default, Clone)]
pub struct CatalogReport {
    pub cataloged: Vec<String>,
    pub skipped: Vec<(PathBuf, String)>,
}

pub struct ModuleHost {
    modules_dir: PathBuf,
    known: BTreeMap<String, KnownModule>,
    loaded: HashMap<String, LoadedModule>,
    registry: ModuleRegistry,
    loader: Box<dyn ModuleLoader>,
    dispatcher: Dispatcher,
    health: HostHealth,
    release_on_drop: bool,
}

impl ModuleHost {
    /// Create a host managing `modules_dir`, creating the directory if needed.
    ///
    /// Failure to create it leaves the host usable in [`HostHealth::Degraded`].
    pub fn new(modules_dir: impl Into<PathBuf>, loader: Box<dyn ModuleLoader>) -> Self {
        let modules_dir = modules_dir.into();
        let health = match fs::create_dir_all(&modules_dir) {
            Ok(()) => HostHealth::Ready,
            Err(e) => {
                let reason = format!(
                    "cannot create modules directory {}: {}",
                    modules_dir.display(),
                    e
                );
                warn!("Host running degraded: {}", reason);
                HostHealth::Degraded(reason)
            }
        };

        ModuleHost {
            modules_dir,
            known: BTreeMap::new(),
            loaded: HashMap::new(),
            registry: ModuleRegistry::new(),
            loader,
            dispatcher: Dispatcher::new(),
            health,
            release_on_drop: true,
        }
    }

    /// Host loading native libraries, managing the configured modules directory
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.modules_dir(), Box::new(NativeLoader::new()))
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    pub fn health(&self) -> &HostHealth {
        &self.health
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Whether dropping the host unmaps module libraries (the default).
    ///
    /// A short-lived host about to exit the process can keep them mapped so
    /// module threads still winding down never run unmapped code.
    pub fn set_release_on_drop(&mut self, release: bool) {
        self.release_on_drop = release;
    }

    /// Catalog the module file at `path`. Returns its registry name.
    ///
    /// A name seen before is re-pointed at `path`.
    pub fn process_module(&mut self, path: &Path) -> Result<String, HostError> {
        let descriptor = Self::read_descriptor(path)?;
        Ok(self.catalog(path, descriptor))
    }

    fn read_descriptor(path: &Path) -> Result<ModuleDescriptor, HostError> {
        modhost_descriptor::try_read(path).map_err(|source| {
            warn!("Cannot process {}: {}", path.display(), source);
            HostError::MalformedDescriptor {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn catalog(&mut self, path: &Path, descriptor: ModuleDescriptor) -> String {
        let name = descriptor.key();
        info!(module = %name, path = %path.display(), "Cataloged module");
        if !descriptor.dependencies.is_empty() {
            debug!(module = %name, dependencies = ?descriptor.dependencies, "Declared dependencies");
        }

        let previous = self.known.insert(
            name.clone(),
            KnownModule {
                name: name.clone(),
                file_path: path.to_path_buf(),
                descriptor,
            },
        );
        if let Some(previous) = previous.filter(|p| p.file_path.as_path() != path) {
            debug!(
                module = %name,
                "Replacing previously cataloged file {}",
                previous.file_path.display()
            );
        }

        self.warn_missing_dependencies(&name);
        name
    }

    /// Scan `dirs` in priority order and catalog every module found.
    ///
    /// Within one pass the first file to claim a module name keeps it, so a
    /// higher priority directory wins even when the file names differ.
    pub fn discover_and_catalog<P: AsRef<Path>>(&mut self, dirs: &[P]) -> CatalogReport {
        let mut report = CatalogReport::default();
        for path in scanner::scan(dirs) {
            let descriptor = match Self::read_descriptor(&path) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    report.skipped.push((path, e.to_string()));
                    continue;
                }
            };

            let name = descriptor.key();
            if report.cataloged.contains(&name) {
                let claimed = self
                    .known
                    .get(&name)
                    .map(|known| known.file_path.display().to_string())
                    .unwrap_or_default();
                debug!(module = %name, "Ignoring {}: name taken by {}", path.display(), claimed);
                let reason = format!("module '{}' already cataloged from {}", name, claimed);
                report.skipped.push((path, reason));
                continue;
            }
            report.cataloged.push(self.catalog(&path, descriptor));
        }
        info!(
            "Cataloged {} module(s), skipped {}",
            report.cataloged.len(),
            report.skipped.len()
        );
        report
    }

    /// Instantiate known module `name` and register it.
    ///
    /// Loading an already loaded module succeeds without doing anything.
    /// Only the entry object is constructed; any start-up work the module
    /// kicks off is not waited for.
    pub fn load_module(&mut self, name: &str) -> Result<(), HostError> {
        let key = normalize_name(name);
        let Some(known) = self.known.get(&key) else {
            warn!(module = %key, "Cannot load unknown module");
            return Err(HostError::NotKnown(key));
        };
        if self.loaded.contains_key(&key) {
            debug!(module = %key, "Already loaded");
            return Ok(());
        }

        let LoadedLibrary { instance, library } = self
            .loader
            .load(&key, &known.file_path)
            .map_err(|source| {
                warn!(module = %key, "Load failed: {}", source);
                HostError::Load {
                    name: key.clone(),
                    source,
                }
            })?;

        let violation = if instance.name().trim().is_empty() {
            Some("empty name")
        } else if instance.version().trim().is_empty() {
            Some("empty version")
        } else {
            None
        };
        if let Some(reason) = violation {
            drop(instance);
            library.release();
            warn!(module = %key, "Rejected: {}", reason);
            return Err(HostError::Contract {
                name: key,
                reason: reason.to_string(),
            });
        }

        if normalize_name(instance.name()) != key {
            warn!(
                module = %key,
                "Name mismatch: descriptor says '{}', module says '{}'",
                known.descriptor.name,
                instance.name()
            );
        }

        let instance: Rc<dyn Module> = Rc::from(instance);
        self.registry.register(&key, Rc::clone(&instance));
        info!(module = %key, version = %instance.version(), "Loaded module");
        self.loaded.insert(key.clone(), LoadedModule { instance, library });

        self.warn_missing_dependencies(&key);
        Ok(())
    }

    /// Unregister module `name`, drop its instance and release its library.
    ///
    /// The library stays mapped for the rest of the process when something
    /// outside the host still holds the instance, or when posted jobs are
    /// still queued (they may run the module's code on the next pump).
    /// Background threads the module started must be finished before
    /// unloading; jobs they post after a release would run unmapped code.
    pub fn unload_module(&mut self, name: &str) -> Result<(), HostError> {
        let key = normalize_name(name);
        let Some(LoadedModule { instance, library }) = self.loaded.remove(&key) else {
            warn!(module = %key, "Cannot unload: not loaded");
            return Err(HostError::NotLoaded(key));
        };
        self.detach(&key, instance, library, true);
        Ok(())
    }

    fn detach(
        &mut self,
        key: &str,
        instance: Rc<dyn Module>,
        library: LibraryHandle,
        release: bool,
    ) {
        self.registry.unregister(key);
        let outstanding = Rc::strong_count(&instance) + Rc::weak_count(&instance) > 1;
        drop(instance);

        let keep = if outstanding {
            Some("instance still referenced after unload")
        } else if self.dispatcher.pending() > 0 {
            Some("posted jobs are still queued")
        } else {
            None
        };

        match keep {
            _ if !release => library.leak(),
            Some(reason) => {
                warn!(module = %key, "Keeping library mapped: {}", reason);
                library.leak();
            }
            None => library.release(),
        }
        info!(module = %key, "Unloaded module");
    }

    /// Every known module with its load state, sorted by name
    pub fn list_known(&self) -> Vec<ModuleStatus> {
        self.known
            .values()
            .map(|known| ModuleStatus {
                name: known.name.clone(),
                loaded: self.loaded.contains_key(&known.name),
                file_path: known.file_path.clone(),
                descriptor: known.descriptor.clone(),
            })
            .collect()
    }

    /// Names of loaded modules, sorted
    pub fn list_loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn known(&self, name: &str) -> Option<&KnownModule> {
        self.known.get(&normalize_name(name))
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(&normalize_name(name))
    }

    /// Declared dependencies of `name` that are not loaded right now
    pub fn missing_dependencies(&self, name: &str) -> Vec<String> {
        self.known(name)
            .map(|known| {
                known
                    .descriptor
                    .dependencies
                    .iter()
                    .filter(|dep| !self.is_loaded(dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn warn_missing_dependencies(&self, name: &str) {
        for dependency in self.missing_dependencies(name) {
            warn!(
                module = %name,
                dependency = %dependency,
                "Dependency '{}' is not loaded",
                dependency
            );
        }
    }

    /// Handle for posting work onto the control thread from anywhere
    pub fn dispatch_handle(&self) -> DispatchHandle {
        self.dispatcher.handle()
    }

    /// Context for calling into loaded modules from the control thread
    pub fn context(&self) -> InvokeContext<'_> {
        InvokeContext::new(&self.registry, self.dispatcher.handle())
    }

    /// Run jobs modules posted from other threads. Returns how many ran.
    pub fn pump(&self) -> usize {
        self.dispatcher.pump(&self.registry)
    }
}

impl Drop for ModuleHost {
    fn drop(&mut self) {
        // Queued jobs and instances must go before the code that implements them.
        let dropped = self.dispatcher.discard();
        if dropped > 0 {
            debug!("Discarded {} queued job(s) on shutdown", dropped);
        }
        let release = self.release_on_drop;
        for name in self.list_loaded() {
            if let Some(LoadedModule { instance, library }) = self.loaded.remove(&name) {
                self.detach(&name, instance, library, release);
            }
        }
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules_dir", &self.modules_dir)
            .field("known", &self.known.keys().collect::<Vec<_>>())
            .field("loaded", &self.list_loaded())
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}
