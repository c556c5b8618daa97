//! Mock implementations for testing
//!
//! Provides a recording notification channel and a fixed process ranking so
//! the engine can be exercised without network access or a live process table.

use crate::alerts::{DeliveryReport, Device, Notification, NotificationProvider};
use crate::domain::ProcessUsage;
use crate::error::NotifyError;
use crate::sampler::ProcessRanking;

use std::collections::BTreeSet;
use std::sync::Mutex;

/// Notification channel that records every delivery
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Notification, BTreeSet<String>)>>,
    key: Mutex<Option<String>>,
    valid_key: Option<String>,
    failing: bool,
}

impl RecordingNotifier {
    /// Create a notifier that accepts any non-empty key and always delivers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier whose deliveries all fail (still recorded)
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Builder: only accept this exact key
    pub fn with_valid_key(mut self, key: impl Into<String>) -> Self {
        self.valid_key = Some(key.into());
        self
    }

    /// Everything passed to `notify`, in call order
    pub fn sent(&self) -> Vec<(Notification, BTreeSet<String>)> {
        self.sent.lock().unwrap().clone()
    }

    /// Currently installed key
    pub fn key(&self) -> Option<String> {
        self.key.lock().unwrap().clone()
    }
}

impl NotificationProvider for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_channel_key(&self, key: &str) -> bool {
        let valid = match &self.valid_key {
            Some(expected) => expected == key,
            None => !key.is_empty(),
        };
        if valid {
            *self.key.lock().unwrap() = Some(key.to_string());
        }
        valid
    }

    fn list_devices(&self) -> Option<Vec<Device>> {
        self.key
            .lock()
            .unwrap()
            .as_ref()
            .map(|_| vec![Device::new("phone", "Mock Phone")])
    }

    fn notify(
        &self,
        notification: &Notification,
        device_ids: &BTreeSet<String>,
    ) -> DeliveryReport {
        self.sent
            .lock()
            .unwrap()
            .push((notification.clone(), device_ids.clone()));

        if self.failing {
            DeliveryReport::all_failed(device_ids, || NotifyError::UnknownDevice("mock".into()))
        } else {
            DeliveryReport {
                delivered: device_ids.iter().cloned().collect(),
                failed: Vec::new(),
            }
        }
    }
}

/// Process ranking returning preset answers
#[derive(Debug, Clone, Default)]
pub struct FixedRanking {
    cpu: Option<ProcessUsage>,
    ram: Option<ProcessUsage>,
}

impl FixedRanking {
    pub fn new(cpu: Option<ProcessUsage>, ram: Option<ProcessUsage>) -> Self {
        Self { cpu, ram }
    }
}

impl ProcessRanking for FixedRanking {
    fn highest_cpu_consumer(&self, _window: usize) -> Option<ProcessUsage> {
        self.cpu.clone()
    }

    fn highest_ram_consumer(&self, _window: usize) -> Option<ProcessUsage> {
        self.ram.clone()
    }
}
