//! Copying modules into the managed directory

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use modhost_descriptor::sidecar_path;

use crate::errors::HostError;
use crate::host::ModuleHost;

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> HostError {
    let path = path.to_path_buf();
    move |source| HostError::Io {
        action,
        path,
        source,
    }
}

/// Relative paths without `..` or root components
fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

impl ModuleHost {
    /// Copy the module at `source` into the managed directory and catalog it.
    ///
    /// The sidecar descriptor travels with the library. Auxiliary files the
    /// descriptor lists are copied when present beside `source`; missing or
    /// uncopyable auxiliaries only produce warnings. Returns the module name.
    pub fn install(&mut self, source: &Path) -> Result<String, HostError> {
        if !source.is_file() {
            warn!("Cannot install {}: not a file", source.display());
            return Err(HostError::SourceMissing(source.to_path_buf()));
        }
        let Some(file_name) = source.file_name() else {
            return Err(HostError::SourceMissing(source.to_path_buf()));
        };

        let modules_dir = self.modules_dir().to_path_buf();
        fs::create_dir_all(&modules_dir)
            .map_err(io_error("create modules directory", &modules_dir))?;

        let destination = modules_dir.join(file_name);
        if is_same_file(source, &destination) {
            debug!("{} is already in the modules directory", source.display());
            return self.process_module(&destination);
        }

        if destination.exists() {
            fs::remove_file(&destination).map_err(io_error("replace", &destination))?;
        }
        fs::copy(source, &destination).map_err(io_error("copy module to", &destination))?;
        debug!("Copied {} to {}", source.display(), destination.display());

        let sidecar = sidecar_path(source);
        if sidecar.is_file() {
            let target = sidecar_path(&destination);
            fs::copy(&sidecar, &target).map_err(io_error("copy descriptor to", &target))?;
        }

        let source_dir = source.parent().unwrap_or_else(|| Path::new("."));
        if let Some(descriptor) = modhost_descriptor::read(&destination) {
            for auxiliary in &descriptor.auxiliary_files {
                copy_auxiliary(source_dir, &modules_dir, auxiliary);
            }
        }

        let name = self.process_module(&destination)?;
        info!(module = %name, "Installed {}", destination.display());
        Ok(name)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy one auxiliary file next to the installed module. Never fails the install.
fn copy_auxiliary(source_dir: &Path, target_dir: &Path, auxiliary: &str) -> Option<PathBuf> {
    let relative = Path::new(auxiliary);
    if !is_contained(relative) {
        warn!("Skipping auxiliary file '{}': path leaves the module directory", auxiliary);
        return None;
    }

    let from = source_dir.join(relative);
    if !from.is_file() {
        warn!("Auxiliary file '{}' not found beside the module", auxiliary);
        return None;
    }

    let to = target_dir.join(relative);
    if let Some(parent) = to.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Cannot create {}: {}", parent.display(), e);
            return None;
        }
    }
    match fs::copy(&from, &to) {
        Ok(_) => {
            debug!("Copied auxiliary file {}", to.display());
            Some(to)
        }
        Err(e) => {
            warn!("Failed to copy auxiliary file '{}': {}", auxiliary, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{demo_host, write_module};
    use modhost_abi::ValueKind;
    use modhost_descriptor::{write_sidecar, ModuleDescriptor};
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_install_missing_source_leaves_managed_dir_alone() {
        let Ok(root) = TempDir::new() else {
            return;
        };
        let managed = root.path().join("managed");
        let mut host = demo_host(&managed);
        assert!(dir_entries(&managed).is_empty());

        let result = host.install(&root.path().join("libmissing.so"));
        assert!(matches!(result, Err(HostError::SourceMissing(_))));
        assert!(dir_entries(&managed).is_empty());

        // Not recreated either when it has gone away since start-up
        assert!(fs::remove_dir(&managed).is_ok());
        assert!(host.install(&root.path().join("libmissing.so")).is_err());
        assert!(!managed.exists());
    }

    #[test]
    fn test_install_copies_present_auxiliaries_only() {
        let Ok(root) = TempDir::new() else {
            return;
        };
        let source_dir = root.path().join("src");
        assert!(fs::create_dir_all(&source_dir).is_ok());
        let descriptor = ModuleDescriptor::new("greeter").with_auxiliary_files(["a.txt", "b.txt"]);
        let source = write_module(&source_dir, "greeter", &descriptor);
        assert!(fs::write(source_dir.join("a.txt"), "aux").is_ok());

        let managed = root.path().join("managed");
        let mut host = demo_host(&managed);
        let result = host.install(&source);
        assert!(result.is_ok_and(|name| name == "greeter"));

        let Some(file_name) = source.file_name() else {
            return;
        };
        assert!(managed.join(file_name).is_file());
        assert!(managed.join("a.txt").is_file());
        assert!(!managed.join("b.txt").exists());
        assert!(host
            .known("greeter")
            .is_some_and(|k| k.file_path == managed.join(file_name)));
    }

    #[test]
    fn test_install_carries_sidecar_and_overwrites() {
        let Ok(root) = TempDir::new() else {
            return;
        };
        let source_dir = root.path().join("src");
        assert!(fs::create_dir_all(&source_dir).is_ok());
        let source = source_dir.join(modhost_config::library_file_name("calculator"));
        assert!(fs::write(&source, b"no embedded descriptor").is_ok());
        assert!(write_sidecar(&ModuleDescriptor::new("calculator"), &source).is_ok());

        let managed = root.path().join("managed");
        let mut host = demo_host(&managed);
        assert!(host.install(&source).is_ok());
        assert!(host.install(&source).is_ok());

        let Some(file_name) = source.file_name() else {
            return;
        };
        assert!(sidecar_path(&managed.join(file_name)).is_file());
        assert_eq!(host.list_known().len(), 1);
    }

    #[test]
    fn test_install_then_load_then_introspect() {
        let Ok(root) = TempDir::new() else {
            return;
        };
        let source = write_module(root.path(), "calculator", &ModuleDescriptor::new("calculator"));
        let mut host = demo_host(&root.path().join("managed"));

        let Ok(name) = host.install(&source) else {
            return;
        };
        assert!(host.load_module(&name).is_ok());

        let operations = host.list_operations(&name);
        let names: Vec<&str> = operations.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["add", "subtract", "echo"]);
        assert!(operations.iter().all(|op| op.name != "name" && op.name != "version"));
        assert_eq!(operations[0].return_kind, ValueKind::Int);
    }

    #[test]
    fn test_auxiliary_paths_stay_inside() {
        assert!(is_contained(Path::new("data/a.txt")));
        assert!(!is_contained(Path::new("../a.txt")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }

    #[test]
    fn test_install_without_descriptor_fails_processing() {
        let Ok(root) = TempDir::new() else {
            return;
        };
        let source = root.path().join(modhost_config::library_file_name("anon"));
        assert!(fs::write(&source, b"bytes").is_ok());

        let mut host = demo_host(&root.path().join("managed"));
        assert!(matches!(
            host.install(&source),
            Err(HostError::MalformedDescriptor { .. })
        ));
    }
}
