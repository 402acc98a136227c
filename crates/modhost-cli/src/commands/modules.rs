//! Catalog views and installation

use colored::Colorize;
use std::path::Path;

use modhost_core::ModuleStatus;
use modhost_descriptor::ModuleDescriptor;
use modhost_logger as logger;

use crate::common::{load_with_dependencies, open_host};
use crate::GlobalOpts;

fn status_label(loaded: bool) -> colored::ColoredString {
    if loaded {
        "loaded".green()
    } else {
        "known".dimmed()
    }
}

fn print_row(status: &ModuleStatus) {
    let version = status.descriptor.version.as_deref().unwrap_or("-");
    println!(
        "  {} {} [{}]",
        status.name.bold(),
        version.dimmed(),
        status_label(status.loaded)
    );
    if let Some(description) = &status.descriptor.description {
        println!("      {}", description);
    }
}

/// List every cataloged module. With `loaded`, try loading each one first
/// and show only those that came up.
pub fn list_modules(opts: &GlobalOpts, loaded: bool) -> anyhow::Result<()> {
    let mut host = open_host()?;

    if loaded {
        let names: Vec<String> = host.list_known().into_iter().map(|m| m.name).collect();
        for name in names {
            if let Err(e) = load_with_dependencies(&mut host, &name) {
                logger::warn(&format!("{:#}", e));
            }
        }
    }

    let rows: Vec<ModuleStatus> = host
        .list_known()
        .into_iter()
        .filter(|status| !loaded || status.loaded)
        .collect();

    if rows.is_empty() {
        if !opts.quiet {
            println!("{}", "No modules found".yellow());
        }
        return Ok(());
    }

    println!("{}", "Modules:".bold().green());
    for status in &rows {
        print_row(status);
    }
    Ok(())
}

/// Show the discovery directories and what each scan found or skipped.
pub fn scan_modules(opts: &GlobalOpts) -> anyhow::Result<()> {
    let config = modhost_config::HostConfig::load()?;
    let dirs = config.discovery_dirs();

    println!("{}", "Discovery directories:".bold().green());
    for dir in &dirs {
        let marker = if dir.is_dir() { "" } else { " (missing)" };
        println!("  {}{}", dir.display(), marker.dimmed());
    }

    let mut host = modhost_core::ModuleHost::from_config(&config);
    let report = host.discover_and_catalog(&dirs);

    println!("{}", "Cataloged:".bold().green());
    for status in host.list_known() {
        println!(
            "  {} {}",
            status.name.bold(),
            status.file_path.display().to_string().dimmed()
        );
    }
    if !report.skipped.is_empty() && !opts.quiet {
        println!("{}", "Skipped:".bold().yellow());
        for (path, reason) in &report.skipped {
            println!("  {}: {}", path.display(), reason);
        }
    }
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("  {:<14} -", label);
    } else {
        println!("  {:<14} {}", label, items.join(", "));
    }
}

fn print_descriptor(descriptor: &ModuleDescriptor) {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("  {:<14} {}", "name:", descriptor.name);
    println!("  {:<14} {}", "version:", field(&descriptor.version));
    println!("  {:<14} {}", "author:", field(&descriptor.author));
    println!("  {:<14} {}", "description:", field(&descriptor.description));
    println!("  {:<14} {}", "category:", field(&descriptor.category));
    print_list("capabilities:", &descriptor.capabilities);
    print_list("dependencies:", &descriptor.dependencies);
    print_list("files:", &descriptor.auxiliary_files);
}

/// Details of one known module
pub fn show_info(name: &str) -> anyhow::Result<()> {
    let host = open_host()?;
    let Some(known) = host.known(name) else {
        anyhow::bail!("Module '{}' is not known", name);
    };

    println!("{}", known.name.bold().green());
    print_descriptor(&known.descriptor);
    println!("  {:<14} {}", "path:", known.file_path.display());
    println!("  {:<14} {}", "state:", status_label(host.is_loaded(name)));
    Ok(())
}

pub fn install_module(source: &Path) -> anyhow::Result<()> {
    let mut host = open_host()?;
    logger::spinner_start(&format!("Installing {}", source.display()));
    match host.install(source) {
        Ok(name) => {
            logger::spinner_success(&format!(
                "Installed '{}' into {}",
                name,
                host.modules_dir().display()
            ));
            Ok(())
        }
        Err(e) => {
            logger::spinner_error(&format!("Install failed: {}", source.display()));
            Err(e.into())
        }
    }
}
