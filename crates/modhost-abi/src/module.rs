//! The base module contract

use std::rc::Rc;

use crate::dispatch::DispatchHandle;
use crate::interfaces::{Interfaces, LookupError};
use crate::operation::{InvokeError, OperationSpec, Value};

/// Entry object of a hosted module.
///
/// `name` and `version` form the base contract every module satisfies. The
/// operation table lists only the module's own operations; the base contract
/// never appears in it.
pub trait Module: 'static {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Operations this module exposes to generic tooling
    fn operations(&self) -> &'static [OperationSpec] {
        &[]
    }

    /// Invoke one of the operations listed in [`Module::operations`].
    ///
    /// Arguments have already been checked against the operation table.
    fn invoke(
        &self,
        ctx: &InvokeContext<'_>,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        let _ = (ctx, args);
        Err(InvokeError::UnknownOperation(operation.to_string()))
    }

    /// Register the typed interfaces other modules may look this module up as.
    fn provide(self: Rc<Self>, interfaces: &mut Interfaces) {
        let _ = interfaces;
    }
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name())
            .field("version", &self.version())
            .finish()
    }
}

/// Read access to the interfaces of loaded modules
pub trait Lookup {
    /// Interfaces registered under `name` (normalized by the implementation).
    fn interfaces(&self, name: &str) -> Option<&Interfaces>;
}

/// A lookup with nothing in it, for invoking a module outside any host
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

impl Lookup for NoModules {
    fn interfaces(&self, _name: &str) -> Option<&Interfaces> {
        None
    }
}

/// Everything a module operation may use from the host while it runs
pub struct InvokeContext<'a> {
    lookup: &'a dyn Lookup,
    dispatch: DispatchHandle,
}

impl<'a> InvokeContext<'a> {
    pub fn new(lookup: &'a dyn Lookup, dispatch: DispatchHandle) -> Self {
        InvokeContext { lookup, dispatch }
    }

    /// Look up interface `T` of the loaded module `name`.
    pub fn get<T: ?Sized + 'static>(&self, name: &str) -> Result<Rc<T>, LookupError> {
        self.lookup
            .interfaces(name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?
            .resolve::<T>(name)
    }

    pub fn lookup(&self) -> &dyn Lookup {
        self.lookup
    }

    /// Handle for posting work back onto the host's control thread
    pub fn dispatch(&self) -> &DispatchHandle {
        &self.dispatch
    }
}
