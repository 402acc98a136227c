//! Descriptor writers used by packaging and tests

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use modhost_abi::{DESCRIPTOR_BEGIN, DESCRIPTOR_END};

use crate::errors::DescriptorError;
use crate::reader::sidecar_path;
use crate::types::ModuleDescriptor;

/// The descriptor as it appears when embedded in a module binary
pub fn embedded_bytes(descriptor: &ModuleDescriptor) -> Result<Vec<u8>, DescriptorError> {
    let json = serde_json::to_vec(descriptor).map_err(DescriptorError::Serialize)?;
    let mut bytes = Vec::with_capacity(DESCRIPTOR_BEGIN.len() + json.len() + DESCRIPTOR_END.len());
    bytes.extend_from_slice(DESCRIPTOR_BEGIN.as_bytes());
    bytes.extend_from_slice(&json);
    bytes.extend_from_slice(DESCRIPTOR_END.as_bytes());
    Ok(bytes)
}

/// Write `descriptor` as the sidecar of the module file at `module_path`.
pub fn write_sidecar(
    descriptor: &ModuleDescriptor,
    module_path: &Path,
) -> Result<PathBuf, DescriptorError> {
    let path = sidecar_path(module_path);
    let json = descriptor.to_json_pretty()?;
    fs::write(&path, json).map_err(|source| DescriptorError::Io {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote sidecar descriptor to {}", path.display());
    Ok(path)
}
