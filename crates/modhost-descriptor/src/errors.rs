use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a descriptor could not be read
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Module file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed descriptor ({origin}): {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Descriptor ({0}) has no name")]
    MissingName(String),

    #[error("Embedded descriptors disagree: '{first}' and '{second}'")]
    Conflicting { first: String, second: String },

    #[error("No embedded or sidecar descriptor for {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to serialize descriptor: {0}")]
    Serialize(#[source] serde_json::Error),
}
