//! Host configuration and platform paths
//!
//! The configuration file is TOML. Its location is resolved, in order, from
//! the `MODHOST_CONFIG` environment variable, a `.modhost_config_path`
//! pointer file next to the default location, and finally the default
//! `<config dir>/modhost/modhost.toml`.

pub mod config;
pub mod library_paths;

pub use config::{ConfigError, HostConfig, CONFIG_ENV};
pub use library_paths::{is_library_file, library_file_name, LIBRARY_EXTENSION, LIBRARY_PREFIX};
