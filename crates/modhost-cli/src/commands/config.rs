use clap::Subcommand;
use colored::Colorize;
use std::fs;

use modhost_config::HostConfig;
use modhost_logger as logger;

use crate::GlobalOpts;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, later runs read the config from that file.
    /// If omitted, the CLI prints the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = HostConfig::load()?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() && opts.verbosity_level() > 0 {
                println!("  {}", "(empty)".yellow());
            }
            for (key, value) in config.values_iter() {
                println!("  {}: {}", key.cyan(), value);
            }
            println!(
                "  {}: {}",
                "effective modules-dir".dimmed(),
                config.modules_dir().display()
            );
        }
        ConfigAction::Set { key, value } => {
            let mut config = HostConfig::load()?;
            if let Err(e) = config.set(&key, &value) {
                anyhow::bail!(
                    "{}. Currently supported keys: {}",
                    e,
                    HostConfig::KEYS.join(", ")
                );
            }
            config.save()?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => {
            let config_path = HostConfig::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));

            match new_path {
                Some(path) => {
                    HostConfig::set_path_override(&path)?;
                    logger::success(&format!("Config path set to {}", path));
                }
                None => {
                    println!("{}", config_path.display());

                    let pointer = HostConfig::pointer_path();
                    if let Ok(contents) = fs::read_to_string(&pointer) {
                        let trimmed = contents.trim();
                        if !trimmed.is_empty() {
                            println!("{} {}", "overridden-by".cyan(), trimmed);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
