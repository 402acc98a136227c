//! Common types and utilities shared across commands

use clap::Parser;
use std::collections::HashSet;

use modhost_config::HostConfig;
use modhost_core::{HostHealth, ModuleHost};
use modhost_logger as logger;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Load the configuration, start a host on it and catalog every discovery directory.
pub fn open_host() -> anyhow::Result<ModuleHost> {
    let config = HostConfig::load()?;
    let mut host = ModuleHost::from_config(&config);
    // The process ends right after the command
    host.set_release_on_drop(false);
    if let HostHealth::Degraded(reason) = host.health() {
        logger::warn(reason);
    }

    let dirs = config.discovery_dirs();
    for dir in &dirs {
        logger::step(&format!("Searching {}", dir.display()));
    }
    let report = host.discover_and_catalog(&dirs);
    for (path, reason) in &report.skipped {
        logger::debug(&format!("Skipped {}: {}", path.display(), reason));
    }
    Ok(host)
}

/// Load `name` after its declared dependencies, depth first.
///
/// Dependencies that fail to load are reported and skipped; the host treats
/// them as advisory.
pub fn load_with_dependencies(host: &mut ModuleHost, name: &str) -> anyhow::Result<()> {
    let mut visiting = HashSet::new();
    load_recursive(host, name, &mut visiting, true)
}

fn load_recursive(
    host: &mut ModuleHost,
    name: &str,
    visiting: &mut HashSet<String>,
    required: bool,
) -> anyhow::Result<()> {
    let key = modhost_abi::normalize_name(name);
    if host.is_loaded(&key) || !visiting.insert(key.clone()) {
        return Ok(());
    }

    let dependencies = host
        .known(&key)
        .map(|known| known.descriptor.dependencies.clone())
        .unwrap_or_default();
    for dependency in dependencies {
        load_recursive(host, &dependency, visiting, false)?;
    }

    match host.load_module(&key) {
        Ok(()) => {
            logger::step(&format!("Loaded {}", key));
            Ok(())
        }
        Err(e) if !required => {
            logger::warn(&format!("Dependency '{}' not loaded: {}", key, e));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 0);

        let opts = GlobalOpts {
            quiet: false,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 2);
    }
}
