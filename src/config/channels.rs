//! Channel registry
//!
//! Builds notification providers from `[[channels]]` entries and keeps them
//! by name so alert definitions can share them.

use crate::alerts::channels::{pushbullet::PushbulletNotifier, webhook::WebhookNotifier};
use crate::alerts::{NotificationProvider, TerminalNotifier};
use crate::config::{ChannelConfig, ChannelKind};
use crate::error::ConfigError;

use std::collections::BTreeMap;
use std::sync::Arc;

struct Entry {
    config: ChannelConfig,
    provider: Arc<dyn NotificationProvider>,
}

/// Named notification providers
#[derive(Default)]
pub struct ChannelRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ChannelRegistry {
    /// Build every configured channel and install its key
    ///
    /// A rejected key is logged; the channel stays usable without it.
    pub fn from_config(channels: &[ChannelConfig]) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for channel in channels {
            if registry.entries.contains_key(&channel.name) {
                return Err(ConfigError::InvalidValue {
                    key: "channels.name".to_string(),
                    message: format!("duplicate channel '{}'", channel.name),
                });
            }
            let provider = build_provider(channel)?;
            install_key(&channel.name, provider.as_ref(), channel.key.as_deref());
            registry.entries.insert(
                channel.name.clone(),
                Entry {
                    config: channel.clone(),
                    provider,
                },
            );
        }
        Ok(registry)
    }

    /// Register an already-built provider
    pub fn insert(&mut self, name: impl Into<String>, provider: Arc<dyn NotificationProvider>) {
        let name = name.into();
        let config = ChannelConfig {
            name: name.clone(),
            kind: ChannelKind::Terminal,
            key: None,
            endpoints: BTreeMap::new(),
            base_url: None,
        };
        self.entries.insert(name, Entry { config, provider });
    }

    /// Look up a provider by channel name
    pub fn get(&self, name: &str) -> Option<Arc<dyn NotificationProvider>> {
        self.entries.get(name).map(|e| Arc::clone(&e.provider))
    }

    /// Channel names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bring the registry in line with a reloaded channel list
    ///
    /// Channels whose kind or endpoints changed, or whose key was removed,
    /// are rebuilt; a changed key alone is pushed to the existing provider.
    /// Channels no longer listed are dropped. On error the registry is left
    /// as it was.
    pub fn reconcile(&mut self, channels: &[ChannelConfig]) -> Result<(), ConfigError> {
        let mut next = BTreeMap::new();

        for channel in channels {
            if next.contains_key(&channel.name) {
                return Err(ConfigError::InvalidValue {
                    key: "channels.name".to_string(),
                    message: format!("duplicate channel '{}'", channel.name),
                });
            }

            let entry = match self.entries.get(&channel.name) {
                Some(existing) if reusable(&existing.config, channel) => {
                    if existing.config.key != channel.key {
                        install_key(&channel.name, existing.provider.as_ref(), channel.key.as_deref());
                    }
                    Entry {
                        config: channel.clone(),
                        provider: Arc::clone(&existing.provider),
                    }
                }
                _ => {
                    log::info!("Building channel '{}' ({})", channel.name, channel.kind);
                    let provider = build_provider(channel)?;
                    install_key(&channel.name, provider.as_ref(), channel.key.as_deref());
                    Entry {
                        config: channel.clone(),
                        provider,
                    }
                }
            };
            next.insert(channel.name.clone(), entry);
        }

        for name in self.entries.keys().filter(|name| !next.contains_key(*name)) {
            log::info!("Dropping channel '{}'", name);
        }
        self.entries = next;
        Ok(())
    }
}

/// Whether an existing provider can serve the new settings
///
/// A provider cannot forget a key it was given, so dropping the key needs a
/// fresh one.
fn reusable(old: &ChannelConfig, new: &ChannelConfig) -> bool {
    same_shape(old, new) && !(old.key.is_some() && new.key.is_none())
}

fn same_shape(a: &ChannelConfig, b: &ChannelConfig) -> bool {
    a.kind == b.kind && a.endpoints == b.endpoints && a.base_url == b.base_url
}

fn build_provider(channel: &ChannelConfig) -> Result<Arc<dyn NotificationProvider>, ConfigError> {
    let provider: Arc<dyn NotificationProvider> = match channel.kind {
        ChannelKind::Terminal => Arc::new(TerminalNotifier::new()),
        ChannelKind::Webhook => Arc::new(
            WebhookNotifier::new(channel.name.clone(), channel.endpoints.clone())
                .map_err(|e| channel_error(channel, e))?,
        ),
        ChannelKind::Pushbullet => Arc::new(
            PushbulletNotifier::new(channel.name.clone(), channel.base_url.clone())
                .map_err(|e| channel_error(channel, e))?,
        ),
    };
    Ok(provider)
}

fn channel_error(channel: &ChannelConfig, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("channels.{}", channel.name),
        message: err.to_string(),
    }
}

fn install_key(name: &str, provider: &dyn NotificationProvider, key: Option<&str>) {
    if let Some(key) = key {
        if provider.set_channel_key(key) {
            log::debug!("Channel '{}' key accepted", name);
        } else {
            log::warn!("Channel '{}' rejected its configured key", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingNotifier;

    fn terminal(name: &str) -> ChannelConfig {
        ChannelConfig {
            name: name.to_string(),
            kind: ChannelKind::Terminal,
            key: None,
            endpoints: BTreeMap::new(),
            base_url: None,
        }
    }

    fn webhook(name: &str, key: Option<&str>) -> ChannelConfig {
        ChannelConfig {
            name: name.to_string(),
            kind: ChannelKind::Webhook,
            key: key.map(str::to_string),
            endpoints: [("ops".to_string(), "http://127.0.0.1:1/hook".to_string())]
                .into_iter()
                .collect(),
            base_url: None,
        }
    }

    #[test]
    fn test_from_config() {
        let registry =
            ChannelRegistry::from_config(&[terminal("console"), webhook("hooks", Some("k"))])
                .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("console").unwrap().name(), "terminal");
        assert_eq!(registry.get("hooks").unwrap().name(), "hooks");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ChannelRegistry::from_config(&[terminal("a"), terminal("a")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reconcile_keeps_unchanged_provider() {
        let mut registry = ChannelRegistry::from_config(&[webhook("hooks", None)]).unwrap();
        let before = registry.get("hooks").unwrap();

        registry.reconcile(&[webhook("hooks", Some("new-key"))]).unwrap();
        let after = registry.get("hooks").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_reconcile_rebuilds_and_drops() {
        let mut registry =
            ChannelRegistry::from_config(&[terminal("console"), webhook("hooks", None)]).unwrap();
        let before = registry.get("console").unwrap();

        registry.reconcile(&[webhook("console", None)]).unwrap();
        let after = registry.get("console").unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.name(), "console");
        assert!(registry.get("hooks").is_none());
    }

    #[test]
    fn test_reconcile_rebuilds_when_key_removed() {
        let mut registry = ChannelRegistry::from_config(&[webhook("hooks", Some("old-key"))]).unwrap();
        let before = registry.get("hooks").unwrap();

        registry.reconcile(&[webhook("hooks", None)]).unwrap();
        let after = registry.get("hooks").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_reconcile_error_leaves_registry_intact() {
        let mut registry =
            ChannelRegistry::from_config(&[terminal("console"), webhook("hooks", None)]).unwrap();
        let console = registry.get("console").unwrap();

        let result = registry.reconcile(&[
            terminal("console"),
            webhook("hooks", None),
            terminal("console"),
        ]);
        assert!(result.is_err());

        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(&console, &registry.get("console").unwrap()));
        assert!(registry.get("hooks").is_some());
    }

    #[test]
    fn test_insert_provider() {
        let mut registry = ChannelRegistry::default();
        assert!(registry.is_empty());
        registry.insert("mock", Arc::new(RecordingNotifier::new()));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["mock"]);
    }
}
