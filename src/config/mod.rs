//! Configuration system
//!
//! Handles TOML config file parsing, validation, CLI argument merging and
//! conversion into runtime alert definitions and channels.

pub mod builder;
pub mod channels;
pub mod file;

pub use builder::ConfigBuilder;
pub use channels::ChannelRegistry;
pub use file::{ConfigFile, ConfigWatcher};

use crate::alerts::{AlertDefinition, DefinitionUpdate, TerminalNotifier};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Notification channels
    pub channels: Vec<ChannelConfig>,
    /// Alert definitions
    pub alerts: Vec<AlertDefinitionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            channels: vec![ChannelConfig {
                name: "console".to_string(),
                kind: ChannelKind::Terminal,
                key: None,
                endpoints: BTreeMap::new(),
                base_url: None,
            }],
            alerts: vec![AlertDefinitionConfig {
                id: "default".to_string(),
                channel: "console".to_string(),
                devices: [TerminalNotifier::DEVICE_ID.to_string()].into_iter().collect(),
                measurement_window: 5,
                cpu_threshold: 80,
                memory_threshold: 90,
                include_top_process: false,
                enabled: true,
            }],
        }
    }
}

impl Config {
    /// Check every setting, returning all problems found
    pub fn problems(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();

        if self.general.sample_interval_secs == 0 {
            problems.push(invalid("general.sample_interval_secs", "must be at least 1"));
        }
        if self.general.samples_per_reading == 0 {
            problems.push(invalid("general.samples_per_reading", "must be at least 1"));
        }

        let mut channel_names = HashSet::new();
        for channel in &self.channels {
            if !channel_names.insert(channel.name.as_str()) {
                problems.push(invalid(
                    "channels.name",
                    &format!("duplicate channel '{}'", channel.name),
                ));
            }
            if channel.kind == ChannelKind::Pushbullet && channel.key.is_none() {
                problems.push(ConfigError::MissingField(format!(
                    "channels.{}.key",
                    channel.name
                )));
            }
            if channel.kind == ChannelKind::Webhook && channel.endpoints.is_empty() {
                problems.push(invalid(
                    &format!("channels.{}.endpoints", channel.name),
                    "webhook channel needs at least one endpoint",
                ));
            }
        }

        let mut alert_ids = HashSet::new();
        for alert in &self.alerts {
            if !alert_ids.insert(alert.id.as_str()) {
                problems.push(invalid("alerts.id", &format!("duplicate alert '{}'", alert.id)));
            }
            if !channel_names.contains(alert.channel.as_str()) {
                problems.push(invalid(
                    &format!("alerts.{}.channel", alert.id),
                    &format!("unknown channel '{}'", alert.channel),
                ));
            }
            if alert.enabled && alert.devices.is_empty() {
                problems.push(invalid(
                    &format!("alerts.{}.devices", alert.id),
                    "no devices selected",
                ));
            }
            if alert.enabled && alert.measurement_window <= 0 {
                problems.push(invalid(
                    &format!("alerts.{}.measurement_window", alert.id),
                    "must be positive",
                ));
            }
        }

        problems
    }

    /// Fail on the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.problems().into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    /// Build runtime definitions for every configured alert
    ///
    /// Disabled alerts are created inert so they can be enabled on reload.
    pub fn to_definitions(
        &self,
        registry: &ChannelRegistry,
    ) -> Result<Vec<AlertDefinition>, ConfigError> {
        self.alerts
            .iter()
            .map(|a| a.to_definition(registry))
            .collect()
    }

    /// Whether any enabled alert names the top consuming process
    pub fn wants_process_ranking(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| a.enabled && a.include_top_process)
    }

    /// Largest configured measurement window
    pub fn largest_window(&self) -> usize {
        self.alerts
            .iter()
            .map(AlertDefinitionConfig::effective_window)
            .max()
            .unwrap_or(0)
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Seconds between raw readings
    pub sample_interval_secs: u64,
    /// Raw readings averaged into one sample
    pub samples_per_reading: usize,
    /// Samples kept by the engine
    pub log_retention: Option<usize>,
    /// On-disk sample history
    pub history_file: Option<PathBuf>,
    /// Entries kept in the on-disk history
    pub history_limit: usize,
    /// Re-apply the config file when it changes
    pub reload_config: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            sample_interval_secs: 10,
            samples_per_reading: 6,
            log_retention: Some(1440),
            history_file: None,
            history_limit: 50,
            reload_config: true,
        }
    }
}

/// Kind of notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Terminal,
    Webhook,
    Pushbullet,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal => write!(f, "terminal"),
            Self::Webhook => write!(f, "webhook"),
            Self::Pushbullet => write!(f, "pushbullet"),
        }
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Name referenced by alerts
    pub name: String,
    /// Channel implementation
    pub kind: ChannelKind,
    /// Credential (API key or bearer token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// API root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Webhook device id → URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
}

/// Alert definition configuration (TOML-friendly format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefinitionConfig {
    /// Definition identifier
    pub id: String,
    /// Channel name
    pub channel: String,
    /// Target device ids
    #[serde(default)]
    pub devices: BTreeSet<String>,
    /// Trailing samples averaged for the threshold check
    pub measurement_window: i64,
    /// Average CPU percent that must be exceeded
    pub cpu_threshold: u32,
    /// Average memory usage that must be exceeded
    pub memory_threshold: u32,
    /// Name the top consuming process in start notifications
    #[serde(default)]
    pub include_top_process: bool,
    /// Whether the alert is evaluated
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl AlertDefinitionConfig {
    /// Window as used by the engine; disabled or non-positive is inert
    pub fn effective_window(&self) -> usize {
        if !self.enabled || self.measurement_window <= 0 {
            0
        } else {
            self.measurement_window as usize
        }
    }

    /// Convert to a runtime definition
    pub fn to_definition(&self, registry: &ChannelRegistry) -> Result<AlertDefinition, ConfigError> {
        let channel = registry.get(&self.channel).ok_or_else(|| ConfigError::InvalidValue {
            key: format!("alerts.{}.channel", self.id),
            message: format!("unknown channel '{}'", self.channel),
        })?;

        let mut definition = AlertDefinition::new(
            self.id.clone(),
            channel,
            self.effective_window(),
            self.cpu_threshold,
            self.memory_threshold,
        )
        .with_devices(self.devices.iter().cloned());
        definition.include_top_process = self.include_top_process;

        Ok(definition)
    }

    /// Full re-application of this config onto an existing definition
    pub fn to_update(&self, registry: &ChannelRegistry) -> Result<DefinitionUpdate, ConfigError> {
        let definition = self.to_definition(registry)?;
        Ok(DefinitionUpdate {
            channel: Some(definition.channel),
            device_ids: Some(definition.device_ids),
            measurement_window: Some(definition.measurement_window),
            cpu_threshold: Some(definition.cpu_threshold),
            memory_threshold: Some(definition.memory_threshold),
            include_top_process: Some(definition.include_top_process),
        })
    }
}
