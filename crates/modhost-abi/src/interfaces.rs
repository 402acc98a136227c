//! Typed interface sets
//!
//! A module advertises the trait objects it can be used as by inserting them
//! into an [`Interfaces`] set from [`Module::provide`](crate::Module::provide).
//! Lookups are keyed by the `TypeId` of the trait object type, so asking for
//! an interface the module never registered is a distinct, reportable case.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Why a registry lookup did not produce an interface
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Module '{0}' is not loaded")]
    NotFound(String),

    #[error("Module '{module}' does not provide interface {interface}")]
    Unsupported {
        module: String,
        interface: &'static str,
    },
}

/// Set of interface handles provided by a single module
#[derive(Default)]
pub struct Interfaces {
    entries: HashMap<TypeId, Box<dyn Any>>,
    names: Vec<&'static str>,
}

impl Interfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` as the module's implementation of `T`.
    ///
    /// `T` is usually a trait object type, e.g. `insert::<dyn Calculator>(self)`.
    /// Inserting the same `T` twice replaces the earlier handle.
    pub fn insert<T: ?Sized + 'static>(&mut self, handle: Rc<T>) -> &mut Self {
        let previous = self.entries.insert(TypeId::of::<T>(), Box::new(handle));
        if previous.is_none() {
            self.names.push(type_name::<T>());
        }
        self
    }

    /// Get the handle registered for `T`, if any.
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Rc<T>>())
            .cloned()
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Type names of the registered interfaces, in registration order
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `T` on behalf of `module`, reporting a missing interface.
    pub fn resolve<T: ?Sized + 'static>(&self, module: &str) -> Result<Rc<T>, LookupError> {
        self.get::<T>().ok_or_else(|| LookupError::Unsupported {
            module: module.to_string(),
            interface: type_name::<T>(),
        })
    }
}

impl std::fmt::Debug for Interfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interfaces")
            .field("names", &self.names)
            .finish()
    }
}
