//! Descriptor extraction
//!
//! The library bytes are scanned for the begin/end markers; every begin
//! marker is tried because the marker text itself may appear elsewhere in
//! the binary. Every candidate that parses must name the same module, so a
//! library that picked up another module's descriptor through linking is
//! refused rather than cataloged under whichever name comes first. When
//! nothing embedded parses, the `<file stem>.json` sidecar is used.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use modhost_abi::{DESCRIPTOR_BEGIN, DESCRIPTOR_END};

use crate::errors::DescriptorError;
use crate::types::ModuleDescriptor;

/// Read the descriptor of the module at `path`, or `None` if it has no usable one.
pub fn read(path: &Path) -> Option<ModuleDescriptor> {
    match try_read(path) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            debug!("No descriptor for {}: {}", path.display(), e);
            None
        }
    }
}

/// Like [`read`] but reports why nothing usable was found.
pub fn try_read(path: &Path) -> Result<ModuleDescriptor, DescriptorError> {
    if !path.is_file() {
        return Err(DescriptorError::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let embedded = match scan_embedded(&bytes) {
        Some(Ok(descriptor)) => {
            debug!("Embedded descriptor '{}' in {}", descriptor.name, path.display());
            return Ok(descriptor);
        }
        Some(Err(e @ DescriptorError::Conflicting { .. })) => {
            debug!("Refusing {}: {}", path.display(), e);
            return Err(e);
        }
        other => other,
    };

    let sidecar = sidecar_path(path);
    if sidecar.is_file() {
        let content = fs::read(&sidecar).map_err(|source| DescriptorError::Io {
            path: sidecar.clone(),
            source,
        })?;
        let descriptor = ModuleDescriptor::from_slice(&content, &sidecar.display().to_string())?;
        debug!("Sidecar descriptor '{}' for {}", descriptor.name, path.display());
        return Ok(descriptor);
    }

    match embedded {
        Some(Err(e)) => Err(e),
        _ => Err(DescriptorError::Missing(path.to_path_buf())),
    }
}

/// Path of the sidecar descriptor for the module file at `path`
pub fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// First embedded candidate that parses, else the last candidate's error.
/// Parsed candidates naming different modules are a conflict.
/// `None` when the bytes hold no complete marker pair.
fn scan_embedded(bytes: &[u8]) -> Option<Result<ModuleDescriptor, DescriptorError>> {
    let begin = DESCRIPTOR_BEGIN.as_bytes();
    let end = DESCRIPTOR_END.as_bytes();

    let mut parsed: Option<ModuleDescriptor> = None;
    let mut last_error = None;
    let mut offset = 0;
    while let Some(found) = find(&bytes[offset..], begin) {
        let body_start = offset + found + begin.len();
        offset = body_start;

        let Some(body_len) = find(&bytes[body_start..], end) else {
            break;
        };
        let body = &bytes[body_start..body_start + body_len];
        match ModuleDescriptor::from_slice(body, "embedded") {
            Ok(descriptor) => {
                offset = body_start + body_len;
                let first = parsed.as_ref().map(|d| (d.key(), d.name.clone()));
                match first {
                    None => parsed = Some(descriptor),
                    Some((key, name)) if key != descriptor.key() => {
                        return Some(Err(DescriptorError::Conflicting {
                            first: name,
                            second: descriptor.name,
                        }));
                    }
                    Some(_) => {}
                }
            }
            Err(e) => last_error = Some(e),
        }
    }
    parsed.map(Ok).or_else(|| last_error.map(Err))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
