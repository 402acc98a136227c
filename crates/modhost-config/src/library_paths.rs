//! Platform naming of native module libraries

use std::path::Path;

/// File extension of native libraries on this platform
#[cfg(target_os = "windows")]
pub const LIBRARY_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const LIBRARY_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const LIBRARY_EXTENSION: &str = "so";

/// Prefix cargo puts in front of `cdylib` file names
#[cfg(windows)]
pub const LIBRARY_PREFIX: &str = "";
#[cfg(not(windows))]
pub const LIBRARY_PREFIX: &str = "lib";

/// File name cargo produces for a `cdylib` crate named `stem`
///
/// `library_file_name("calculator_module")` is `libcalculator_module.so` on Linux.
pub fn library_file_name(stem: &str) -> String {
    format!("{}{}.{}", LIBRARY_PREFIX, stem, LIBRARY_EXTENSION)
}

/// Whether `path` names a native library for this platform (by extension only)
pub fn is_library_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(LIBRARY_EXTENSION))
}
