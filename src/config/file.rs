//! Configuration file loading
//!
//! Handles loading configuration from TOML files and noticing when a loaded
//! file changes on disk.

use crate::config::Config;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Returns the config together with the path it came from.
    pub fn load_default() -> Option<(Config, PathBuf)> {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        return Some((config, path));
                    }
                    Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
                }
            }
        }
        None
    }

    /// Get default configuration file paths
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide config
        paths.push(PathBuf::from("/etc/perfwatch/config.toml"));

        // User config
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("perfwatch/config.toml"));
        }

        // Current directory
        paths.push(PathBuf::from("perfwatch.toml"));
        paths.push(PathBuf::from(".perfwatch.toml"));

        paths
    }

    /// Write configuration as TOML
    pub fn save<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            }
        }
        std::fs::write(path, content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Watches a config file's modification time
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Start watching; the current state counts as seen
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    /// Watched path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file if it changed since the last call
    ///
    /// A file that fails to parse is reported once and then treated as seen.
    pub fn poll(&mut self) -> Option<Result<Config, ConfigError>> {
        let current = modified(&self.path);
        if current.is_none() || current == self.last_modified {
            return None;
        }
        self.last_modified = current;
        Some(ConfigFile::load(&self.path))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
