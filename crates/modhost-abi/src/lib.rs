//! Module contract for the modhost runtime
//!
//! Everything a hosted module and the host have to agree on lives here:
//! - the [`Module`] trait every entry object implements
//! - the static operation table used for introspection ([`OperationSpec`])
//! - typed interface registration ([`Interfaces`]) for cross-module lookup
//! - the exported declaration and embedded descriptor ([`declare_module!`])
//! - subscriptions, one-shot completions and the control-thread dispatch queue

pub mod declare;
pub mod dispatch;
pub mod events;
pub mod interfaces;
pub mod module;
pub mod operation;

pub use declare::{declaration_symbol, ModuleDeclaration};
pub use dispatch::{DispatchHandle, Dispatcher};
pub use events::{completion, Completer, Pending, Poll, SubscriptionId, Subscribers};
pub use interfaces::{Interfaces, LookupError};
pub use module::{InvokeContext, Lookup, Module, NoModules};
pub use operation::{InvokeError, OperationSpec, ParamSpec, Value, ValueKind};

/// Bumped whenever the layout of [`ModuleDeclaration`] or the [`Module`] trait changes.
pub const ABI_VERSION: u32 = 1;

/// Version of the compiler that built this crate.
pub const RUSTC_VERSION: &str = env!("MODHOST_RUSTC_VERSION");

/// Prefix of the exported declaration symbol; the normalized module name follows it.
pub const DECLARATION_PREFIX: &str = "modhost_declaration_";

/// Marker preceding an embedded JSON descriptor inside a module binary.
pub const DESCRIPTOR_BEGIN: &str = "MODHOST_DESCRIPTOR_BEGIN";

/// Marker following an embedded JSON descriptor inside a module binary.
pub const DESCRIPTOR_END: &str = "MODHOST_DESCRIPTOR_END";

/// Normalize a module name into its registry key.
///
/// Lookups are stable regardless of display casing: `"Simple Calculator"`
/// and `"simple calculator"` both map to `"simple_calculator"`.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Simple Calculator"), "simple_calculator");
        assert_eq!(normalize_name("calculator"), "calculator");
        assert_eq!(normalize_name("  Waku Module "), "waku_module");
    }

    #[test]
    fn test_rustc_version_recorded() {
        assert!(!RUSTC_VERSION.is_empty());
    }
}
