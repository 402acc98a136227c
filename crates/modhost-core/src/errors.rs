use std::io;
use std::path::PathBuf;
use thiserror::Error;

use modhost_abi::InvokeError;
use modhost_descriptor::DescriptorError;

use crate::loader::LoadError;

/// Failures reported by [`ModuleHost`](crate::ModuleHost) operations
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Module '{0}' is not known")]
    NotKnown(String),

    #[error("Module '{0}' is not loaded")]
    NotLoaded(String),

    #[error("No usable descriptor for {}: {source}", path.display())]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error("Failed to load module '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("Module '{name}' does not satisfy the base contract: {reason}")]
    Contract { name: String, reason: String },

    #[error("Source module not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{module}.{operation}' failed: {source}")]
    Invoke {
        module: String,
        operation: String,
        #[source]
        source: InvokeError,
    },
}
