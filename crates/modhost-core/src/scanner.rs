//! Discovery of candidate module files
//!
//! Directories are visited in priority order. Within one directory files are
//! sorted by name. When two directories hold the same file name, only the
//! first one is reported.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use modhost_config::is_library_file;

/// Collect native library files from `dirs`, highest priority first.
///
/// Missing directories are skipped. Only the top level of each directory is
/// searched.
pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Vec<PathBuf> {
    let mut seen: HashSet<OsString> = HashSet::new();
    let mut found = Vec::new();

    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("Skipping missing module directory {}", dir.display());
            continue;
        }

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_library_file(path) {
                continue;
            }
            if seen.insert(entry.file_name().to_os_string()) {
                found.push(path.to_path_buf());
            } else {
                debug!("Ignoring {}: shadowed by an earlier directory", path.display());
            }
        }
    }

    found
}
