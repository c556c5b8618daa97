//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

use std::path::PathBuf;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
    source: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            source: None,
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; without one the default locations are
    /// searched and the built-in defaults kept if none exists.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                self.config = ConfigFile::load(path)?;
                self.source = Some(PathBuf::from(path));
            }
            None => {
                if let Some((config, path)) = ConfigFile::load_default() {
                    self.config = config;
                    self.source = Some(path);
                }
            }
        }
        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI interval
    pub fn with_interval(mut self, interval: Option<u64>) -> Self {
        if let Some(i) = interval {
            self.config.general.sample_interval_secs = i;
        }
        self
    }

    /// Override with CLI readings-per-sample count
    pub fn with_samples_per_reading(mut self, samples: Option<usize>) -> Self {
        if let Some(s) = samples {
            self.config.general.samples_per_reading = s;
        }
        self
    }

    /// Override with CLI history file
    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.config.general.history_file = Some(p);
        }
        self
    }

    /// Path the configuration was loaded from, if any
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }

    /// Build the final configuration and its source path
    pub fn build_with_source(self) -> (Config, Option<PathBuf>) {
        (self.config, self.source)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build();
        assert!(!config.general.verbose);
        assert_eq!(config.general.sample_interval_secs, 10);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_verbose(Some(true))
            .with_interval(Some(2))
            .with_samples_per_reading(Some(3))
            .with_history_file(Some(PathBuf::from("/tmp/h.json")))
            .build();

        assert!(config.general.verbose);
        assert_eq!(config.general.sample_interval_secs, 2);
        assert_eq!(config.general.samples_per_reading, 3);
        assert_eq!(
            config.general.history_file,
            Some(PathBuf::from("/tmp/h.json"))
        );
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let result = ConfigBuilder::new().with_file(Some("/nonexistent/perfwatch.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_file_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perfwatch.toml");
        std::fs::write(&path, "[general]\nsample_interval_secs = 7\n").unwrap();

        let (config, source) = ConfigBuilder::new()
            .with_file(path.to_str())
            .unwrap()
            .with_interval(None)
            .build_with_source();

        assert_eq!(config.general.sample_interval_secs, 7);
        assert_eq!(source, Some(path));
    }
}
