//! Exported module declaration
//!
//! Every module library exports one static [`ModuleDeclaration`] under the
//! symbol `modhost_declaration_<normalized name>`. The per-module suffix lets
//! several modules be linked into one binary (in-process hosting, tests)
//! without symbol clashes.

use crate::module::Module;
use crate::{normalize_name, DECLARATION_PREFIX, DESCRIPTOR_BEGIN, DESCRIPTOR_END};

/// What a module library exports for the host to find
///
/// `repr(C)` keeps `abi_version` first so a loader can check it before
/// trusting the rest of the layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModuleDeclaration {
    pub abi_version: u32,
    pub rustc_version: &'static str,
    /// Descriptor JSON wrapped in the begin/end markers, or empty
    pub embedded_descriptor: &'static str,
    pub create: fn() -> Box<dyn Module>,
}

impl ModuleDeclaration {
    /// The embedded descriptor JSON without its markers
    pub fn descriptor_json(&self) -> Option<&'static str> {
        self.embedded_descriptor
            .strip_prefix(DESCRIPTOR_BEGIN)?
            .strip_suffix(DESCRIPTOR_END)
    }
}

/// Null-terminated symbol name of the declaration for module `name`.
pub fn declaration_symbol(name: &str) -> Vec<u8> {
    let mut symbol = format!("{}{}", DECLARATION_PREFIX, normalize_name(name)).into_bytes();
    symbol.push(0);
    symbol
}

/// Export a module declaration.
///
/// `$name` must already be the normalized module name (lower case, `_` for
/// spaces) because it becomes part of the exported symbol. The optional
/// third argument is a path, relative to the calling file, of a descriptor
/// JSON file to embed in the library.
///
/// ```ignore
/// modhost_abi::declare_module!("calculator", Calculator::new, "../module.json");
/// ```
#[macro_export]
macro_rules! declare_module {
    ($name:literal, $ctor:path) => {
        $crate::declare_module!(@emit $name, $ctor, "");
    };
    ($name:literal, $ctor:path, $descriptor:literal) => {
        $crate::declare_module!(
            @emit $name,
            $ctor,
            concat!(
                "MODHOST_DESCRIPTOR_BEGIN",
                include_str!($descriptor),
                "MODHOST_DESCRIPTOR_END"
            )
        );
    };
    (@emit $name:literal, $ctor:path, $embedded:expr) => {
        #[doc(hidden)]
        #[expect(unsafe_code)]
        #[export_name = concat!("modhost_declaration_", $name)]
        pub static MODHOST_DECLARATION: $crate::ModuleDeclaration = $crate::ModuleDeclaration {
            abi_version: $crate::ABI_VERSION,
            rustc_version: $crate::RUSTC_VERSION,
            embedded_descriptor: $embedded,
            create: {
                fn __modhost_create() -> ::std::boxed::Box<dyn $crate::Module> {
                    ::std::boxed::Box::new($ctor())
                }
                __modhost_create
            },
        };
    };
}
