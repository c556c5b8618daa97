//! Webhook channel
//!
//! Each device id names an endpoint URL. Notifications are POSTed as JSON;
//! the channel key, when set, is sent as a bearer token.

use super::{http_client, status_error, KeySlot};
use crate::alerts::notifier::{DeliveryReport, Device, NotificationProvider};
use crate::alerts::types::Notification;
use crate::error::NotifyError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
    device: &'a str,
}

pub struct WebhookNotifier {
    name: String,
    endpoints: BTreeMap<String, String>,
    key: KeySlot,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    /// Create a webhook channel with device id → URL endpoints
    pub fn new(
        name: impl Into<String>,
        endpoints: BTreeMap<String, String>,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            name: name.into(),
            endpoints,
            key: KeySlot::default(),
            client: http_client()?,
        })
    }

    fn post(&self, url: &str, payload: &WebhookPayload<'_>) -> Result<(), NotifyError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(key) = self.key.get() {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response))
        }
    }
}

impl NotificationProvider for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_channel_key(&self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        self.key.set(key);
        true
    }

    fn list_devices(&self) -> Option<Vec<Device>> {
        Some(
            self.endpoints
                .iter()
                .map(|(id, url)| Device::new(id.clone(), url.clone()))
                .collect(),
        )
    }

    fn notify(
        &self,
        notification: &Notification,
        device_ids: &BTreeSet<String>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for id in device_ids {
            let result = match self.endpoints.get(id) {
                Some(url) => {
                    let payload = WebhookPayload {
                        title: &notification.title,
                        body: &notification.body,
                        device: id,
                    };
                    self.post(url, &payload)
                }
                None => Err(NotifyError::UnknownDevice(id.clone())),
            };
            report.record(id, result);
        }

        report
    }
}
