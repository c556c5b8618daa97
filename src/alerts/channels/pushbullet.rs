//! Pushbullet channel
//!
//! Pushes notes to the account's devices through the Pushbullet REST API.

use super::{http_client, status_error, KeySlot};
use crate::alerts::notifier::{DeliveryReport, Device, NotificationProvider};
use crate::alerts::types::Notification;
use crate::error::NotifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Public API root
pub const DEFAULT_BASE_URL: &str = "https://api.pushbullet.com/v2";

#[derive(Debug, Serialize)]
struct PushNote<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    device_iden: &'a str,
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    #[serde(default)]
    devices: Vec<PushbulletDevice>,
}

#[derive(Debug, Deserialize)]
struct PushbulletDevice {
    iden: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    pushable: bool,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

pub struct PushbulletNotifier {
    name: String,
    base_url: String,
    key: KeySlot,
    client: reqwest::blocking::Client,
}

impl PushbulletNotifier {
    pub fn new(name: impl Into<String>, base_url: Option<String>) -> Result<Self, NotifyError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            key: KeySlot::default(),
            client: http_client()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn validate(&self, key: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .get(self.url("users/me"))
            .header("Access-Token", key)
            .send()?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            401 | 403 => Err(NotifyError::KeyRejected),
            _ => Err(status_error(response)),
        }
    }

    fn fetch_devices(&self, key: &str) -> Result<Vec<Device>, NotifyError> {
        let response = self
            .client
            .get(self.url("devices"))
            .header("Access-Token", key)
            .send()?;
        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let list: DeviceListResponse = response.json()?;
        Ok(list
            .devices
            .into_iter()
            .filter(|d| d.pushable && d.active)
            .map(|d| {
                let display = d.nickname.unwrap_or_else(|| d.iden.clone());
                Device::new(d.iden, display)
            })
            .collect())
    }

    fn push(&self, key: &str, device_iden: &str, notification: &Notification) -> Result<(), NotifyError> {
        let note = PushNote {
            kind: "note",
            device_iden,
            title: &notification.title,
            body: &notification.body,
        };

        let response = self
            .client
            .post(self.url("pushes"))
            .header("Access-Token", key)
            .json(&note)
            .send()?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response))
        }
    }
}

impl NotificationProvider for PushbulletNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_channel_key(&self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }

        match self.validate(key) {
            Ok(()) => {
                self.key.set(key);
                true
            }
            Err(e) => {
                log::debug!("Pushbullet key for '{}' not accepted: {}", self.name, e);
                false
            }
        }
    }

    fn list_devices(&self) -> Option<Vec<Device>> {
        let key = self.key.get()?;
        match self.fetch_devices(&key) {
            Ok(devices) => Some(devices),
            Err(e) => {
                log::warn!("Failed to list Pushbullet devices for '{}': {}", self.name, e);
                None
            }
        }
    }

    fn notify(
        &self,
        notification: &Notification,
        device_ids: &BTreeSet<String>,
    ) -> DeliveryReport {
        let Some(key) = self.key.get() else {
            return DeliveryReport::all_failed(device_ids, || NotifyError::MissingKey);
        };

        let mut report = DeliveryReport::default();
        for id in device_ids {
            report.record(id, self.push(&key, id, notification));
        }
        report
    }
}
