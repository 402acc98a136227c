//! Module descriptors
//!
//! A descriptor is the JSON metadata a module ships with: embedded in the
//! library between marker strings, or as a `<file stem>.json` sidecar next
//! to it. Reading one never loads or executes module code.

pub mod errors;
pub mod reader;
pub mod types;
pub mod writer;

pub use errors::DescriptorError;
pub use reader::{read, sidecar_path, try_read};
pub use types::ModuleDescriptor;
pub use writer::{embedded_bytes, write_sidecar};
