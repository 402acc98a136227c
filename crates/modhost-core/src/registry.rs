//! Named registry of live module instances
//!
//! Only the host writes to the registry. Modules read it through the
//! [`Lookup`] trait handed to them in an [`InvokeContext`](modhost_abi::InvokeContext).

use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

use modhost_abi::{normalize_name, Interfaces, Lookup, LookupError, Module};

struct Entry {
    module: Rc<dyn Module>,
    interfaces: Interfaces,
}

#[derive(Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under the normalized `name`, replacing any previous entry.
    ///
    /// The module is always retrievable as `dyn Module`; anything else it
    /// can be used as comes from [`Module::provide`]. Returns the key used.
    pub fn register(&mut self, name: &str, module: Rc<dyn Module>) -> String {
        let key = normalize_name(name);

        let mut interfaces = Interfaces::new();
        interfaces.insert::<dyn Module>(Rc::clone(&module));
        Rc::clone(&module).provide(&mut interfaces);

        debug!(module = %key, interfaces = ?interfaces.names(), "registered");
        if self.entries.insert(key.clone(), Entry { module, interfaces }).is_some() {
            debug!(module = %key, "replaced existing registry entry");
        }
        key
    }

    /// Remove the entry for `name`. The caller keeps its own handle to the instance.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(&normalize_name(name)).is_some()
    }

    /// Look up interface `T` of module `name`.
    pub fn get<T: ?Sized + 'static>(&self, name: &str) -> Result<Rc<T>, LookupError> {
        let key = normalize_name(name);
        self.entries
            .get(&key)
            .ok_or(LookupError::NotFound(key.clone()))?
            .interfaces
            .resolve::<T>(&key)
    }

    /// Like [`get`](Self::get) without saying why nothing was found
    pub fn find<T: ?Sized + 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.get::<T>(name).ok()
    }

    pub fn module(&self, name: &str) -> Option<Rc<dyn Module>> {
        self.entries
            .get(&normalize_name(name))
            .map(|entry| Rc::clone(&entry.module))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// Registered keys, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Lookup for ModuleRegistry {
    fn interfaces(&self, name: &str) -> Option<&Interfaces> {
        self.entries
            .get(&normalize_name(name))
            .map(|entry| &entry.interfaces)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("names", &self.names())
            .finish()
    }
}
