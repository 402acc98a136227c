use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "MODHOST_CONFIG";

const POINTER_FILE: &str = ".modhost_config_path";

/// Name of the module directory probed below the executable and the working directory
const MODULES_SUBDIR: &str = "modules";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for '{key}': expected true or false")]
    InvalidBool { key: String, value: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Managed directory modules are installed into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules_dir: Option<String>,
    /// Extra read-only discovery directories, in priority order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_dirs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_app_dir: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_current_dir: Option<bool>,
}

impl HostConfig {
    pub const KEYS: [&'static str; 4] = [
        "modules-dir",
        "search-dirs",
        "scan-app-dir",
        "scan-current-dir",
    ];

    pub fn path() -> PathBuf {
        let env_value = std::env::var(CONFIG_ENV).ok();
        resolve_path(env_value.as_deref(), &default_path())
    }

    /// Pointer file that redirects the config location when no env override is set
    pub fn pointer_path() -> PathBuf {
        default_path()
            .parent()
            .map_or_else(|| PathBuf::from(POINTER_FILE), |dir| dir.join(POINTER_FILE))
    }

    /// Point future runs at `target` by writing the pointer file.
    pub fn set_path_override(target: &str) -> Result<PathBuf, ConfigError> {
        let pointer = Self::pointer_path();
        let io_error = |source| ConfigError::Io {
            path: pointer.clone(),
            source,
        };
        if let Some(parent) = pointer.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&pointer, target.trim()).map_err(io_error)?;
        Ok(pointer)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`; a missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(HostConfig::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_error)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "modules-dir" => self.modules_dir.clone(),
            "search-dirs" if !self.search_dirs.is_empty() => Some(self.search_dirs.join(",")),
            "scan-app-dir" => self.scan_app_dir.map(|v| v.to_string()),
            "scan-current-dir" => self.scan_current_dir.map(|v| v.to_string()),
            _ => None,
        }
    }

    /// Set `key` from its textual form. `search-dirs` takes a comma separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "modules-dir" => self.modules_dir = Some(value.to_string()),
            "search-dirs" => {
                self.search_dirs = value
                    .split(',')
                    .map(str::trim)
                    .filter(|dir| !dir.is_empty())
                    .map(String::from)
                    .collect();
            }
            "scan-app-dir" => self.scan_app_dir = Some(parse_bool(key, value)?),
            "scan-current-dir" => self.scan_current_dir = Some(parse_bool(key, value)?),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.modules_dir.is_none()
            && self.search_dirs.is_empty()
            && self.scan_app_dir.is_none()
            && self.scan_current_dir.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        Self::KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    /// Managed install directory, defaulting to `<data dir>/modhost/modules`
    pub fn modules_dir(&self) -> PathBuf {
        if let Some(dir) = &self.modules_dir {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map_or_else(
                || PathBuf::from(MODULES_SUBDIR),
                |base| base.join("modhost").join(MODULES_SUBDIR),
            )
    }

    /// Discovery directories for this process, highest priority first.
    pub fn discovery_dirs(&self) -> Vec<PathBuf> {
        let app_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let current_dir = std::env::current_dir().ok();
        self.discovery_dirs_from(app_dir.as_deref(), current_dir.as_deref())
    }

    /// Discovery order: `<app dir>/modules`, `<current dir>/modules`, each
    /// configured search directory, then the managed modules directory.
    /// Duplicates keep their first position.
    pub fn discovery_dirs_from(
        &self,
        app_dir: Option<&Path>,
        current_dir: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if self.scan_app_dir.unwrap_or(true) {
            dirs.extend(app_dir.map(|dir| dir.join(MODULES_SUBDIR)));
        }
        if self.scan_current_dir.unwrap_or(true) {
            dirs.extend(current_dir.map(|dir| dir.join(MODULES_SUBDIR)));
        }
        dirs.extend(self.search_dirs.iter().map(PathBuf::from));
        dirs.push(self.modules_dir());

        let mut unique: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        unique
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn default_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map_or_else(
            || PathBuf::from(".modhost").join("modhost.toml"),
            |base| base.join("modhost").join("modhost.toml"),
        )
}

/// Env override, then the pointer file next to `default`, then `default`.
fn resolve_path(env_value: Option<&str>, default: &Path) -> PathBuf {
    if let Some(trimmed) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return PathBuf::from(trimmed);
    }

    if let Some(parent) = default.parent() {
        let pointer = parent.join(POINTER_FILE);
        if let Ok(contents) = fs::read_to_string(&pointer) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
    }

    default.to_path_buf()
}
