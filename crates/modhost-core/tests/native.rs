//! Loading the demo modules from their built shared libraries

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use calculator_interface::CalculatorApi;
use modhost_abi::Value;
use modhost_config::library_file_name;
use modhost_core::{HostError, LoadError, ModuleHost, ModuleLoader, NativeLoader};

/// The cdylib built for `crate_name` next to this test binary, if any
fn built_library(crate_name: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let deps = exe.parent()?;
    let profile = deps.parent()?;
    let file = library_file_name(crate_name);
    [deps.join(&file), profile.join(&file)]
        .into_iter()
        .find(|path| path.is_file())
}

/// Copy both demo libraries into `dir`. `None` when they were not built.
fn stage_demo_modules(dir: &Path) -> Option<(PathBuf, PathBuf)> {
    let mut staged = Vec::new();
    for crate_name in ["calculator_module", "greeter_module"] {
        let source = built_library(crate_name)?;
        let target = dir.join(library_file_name(crate_name));
        fs::copy(&source, &target).ok()?;
        staged.push(target);
    }
    let greeter = staged.pop()?;
    let calculator = staged.pop()?;
    Some((calculator, greeter))
}

fn native_host(root: &Path) -> ModuleHost {
    ModuleHost::new(root.join("managed"), Box::new(NativeLoader::new()))
}

#[test]
fn test_catalog_reads_each_library_own_descriptor() {
    let Ok(root) = TempDir::new() else {
        return;
    };
    let Some((calculator, greeter)) = stage_demo_modules(root.path()) else {
        return;
    };

    let mut host = native_host(root.path());
    let report = host.discover_and_catalog(&[root.path()]);
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.cataloged,
        vec!["calculator".to_string(), "greeter".to_string()]
    );
    assert!(host
        .known("calculator")
        .is_some_and(|k| k.file_path == calculator));
    assert!(host.known("greeter").is_some_and(|k| k.file_path == greeter
        && k.descriptor.dependencies == vec!["calculator".to_string()]));
    assert!(host.list_loaded().is_empty());
}

#[test]
fn test_load_invoke_unload_reload() {
    let Ok(root) = TempDir::new() else {
        return;
    };
    if stage_demo_modules(root.path()).is_none() {
        return;
    }

    let mut host = native_host(root.path());
    host.discover_and_catalog(&[root.path()]);
    assert!(host.load_module("calculator").is_ok());
    assert!(host.load_module("greeter").is_ok());
    assert!(host.missing_dependencies("greeter").is_empty());

    let greeting = host.invoke(
        "greeter",
        "greet_with_sum",
        &[Value::from("Ada"), Value::Int(2), Value::Int(3)],
    );
    assert!(greeting.is_ok_and(|v| v == Value::from("Hello, Ada! 2 + 3 = 5")));

    let calc = host.registry().find::<dyn CalculatorApi>("calculator");
    assert!(calc.is_some_and(|c| c.add(40, 2) == Some(42)));

    assert!(host.unload_module("greeter").is_ok());
    assert!(host.unload_module("calculator").is_ok());
    assert!(host.list_loaded().is_empty());
    assert!(matches!(
        host.invoke("calculator", "add", &[Value::Int(1), Value::Int(1)]),
        Err(HostError::NotLoaded(_))
    ));

    assert!(host.load_module("calculator").is_ok());
    let sum = host.invoke("calculator", "add", &[Value::Int(2), Value::Int(3)]);
    assert!(sum.is_ok_and(|v| v == Value::Int(5)));
    assert!(host.unload_module("calculator").is_ok());
}

#[test]
fn test_greeter_without_calculator_fails_cleanly() {
    let Ok(root) = TempDir::new() else {
        return;
    };
    if stage_demo_modules(root.path()).is_none() {
        return;
    }

    let mut host = native_host(root.path());
    host.discover_and_catalog(&[root.path()]);
    assert!(host.load_module("greeter").is_ok());

    let result = host.invoke(
        "greeter",
        "greet_with_sum",
        &[Value::from("Ada"), Value::Int(2), Value::Int(3)],
    );
    assert!(matches!(result, Err(HostError::Invoke { .. })));
    assert!(host.invoke("greeter", "greet", &[Value::from("Ada")]).is_ok());
}

#[test]
fn test_native_loader_needs_matching_symbol() {
    let Ok(root) = TempDir::new() else {
        return;
    };
    let Some((calculator, _)) = stage_demo_modules(root.path()) else {
        return;
    };

    let loader = NativeLoader::new();
    let loaded = loader.load("calculator", &calculator);
    assert!(loaded.is_ok_and(|l| {
        let name_matches = l.instance.name() == "calculator";
        drop(l.instance);
        l.library.release();
        name_matches
    }));

    // The calculator library declares nothing else
    assert!(matches!(
        loader.load("greeter", &calculator),
        Err(LoadError::MissingSymbol { ref symbol }) if symbol == "modhost_declaration_greeter"
    ));
}
