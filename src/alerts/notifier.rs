//! Notification channels
//!
//! Defines the [`NotificationProvider`] capability consumed by the engine and
//! the built-in terminal channel. HTTP-backed channels live in
//! [`super::channels`].

use super::types::Notification;
use crate::error::NotifyError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};

/// A delivery target exposed by a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub display_name: String,
}

impl Device {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Per-device outcome of one `notify` call
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Devices the notification reached
    pub delivered: Vec<String>,
    /// Devices that failed, with the reason
    pub failed: Vec<(String, NotifyError)>,
}

impl DeliveryReport {
    /// Report where every device failed for the same reason
    pub fn all_failed<F>(device_ids: &BTreeSet<String>, reason: F) -> Self
    where
        F: Fn() -> NotifyError,
    {
        Self {
            delivered: Vec::new(),
            failed: device_ids.iter().map(|id| (id.clone(), reason())).collect(),
        }
    }

    pub fn record(&mut self, device_id: &str, result: Result<(), NotifyError>) {
        match result {
            Ok(()) => self.delivered.push(device_id.to_string()),
            Err(e) => self.failed.push((device_id.to_string(), e)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Notification channel capability
///
/// Implementations are shared between definitions and must therefore use
/// interior mutability for the credential. None of the methods may panic or
/// propagate transport failures.
pub trait NotificationProvider: Send + Sync {
    /// Channel name for identification
    fn name(&self) -> &str;

    /// Install a credential, returning whether it validates
    ///
    /// A key that does not validate leaves the previous key in place.
    fn set_channel_key(&self, key: &str) -> bool;

    /// Devices this channel can deliver to, or `None` when unavailable
    fn list_devices(&self) -> Option<Vec<Device>>;

    /// Attempt delivery to every listed device
    ///
    /// A failure for one device never prevents delivery to the others.
    fn notify(&self, notification: &Notification, device_ids: &BTreeSet<String>)
        -> DeliveryReport;
}

/// Terminal/console notifier
///
/// Writes notifications to stderr or stdout. Exposes a single device,
/// [`TerminalNotifier::DEVICE_ID`], and needs no credential.
pub struct TerminalNotifier {
    /// Use stderr instead of stdout
    use_stderr: bool,
    /// Use colors (ANSI escape codes)
    use_colors: bool,
}

impl TerminalNotifier {
    /// The only device id this channel accepts
    pub const DEVICE_ID: &'static str = "terminal";

    /// Create a new terminal notifier
    pub fn new() -> Self {
        Self {
            use_stderr: true,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a notifier that uses stdout
    pub fn stdout() -> Self {
        Self {
            use_stderr: false,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a notifier without colors
    pub fn no_color() -> Self {
        Self {
            use_stderr: true,
            use_colors: false,
        }
    }

    fn supports_color() -> bool {
        std::env::var("TERM")
            .map(|term| term != "dumb")
            .unwrap_or(false)
    }

    fn format_notification(&self, notification: &Notification) -> String {
        let title = if self.use_colors {
            format!("\x1b[33m\x1b[1m{}\x1b[0m", notification.title)
        } else {
            notification.title.clone()
        };

        format!("{}\n{}", title, notification.body)
    }

    fn write(&self, message: &str) -> Result<(), NotifyError> {
        if self.use_stderr {
            let stderr = io::stderr();
            let mut handle = stderr.lock();
            writeln!(handle, "{}", message)?;
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", message)?;
        }
        Ok(())
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationProvider for TerminalNotifier {
    fn name(&self) -> &str {
        "terminal"
    }

    fn set_channel_key(&self, _key: &str) -> bool {
        true
    }

    fn list_devices(&self) -> Option<Vec<Device>> {
        let target = if self.use_stderr { "stderr" } else { "stdout" };
        Some(vec![Device::new(Self::DEVICE_ID, target)])
    }

    fn notify(
        &self,
        notification: &Notification,
        device_ids: &BTreeSet<String>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let message = self.format_notification(notification);

        for id in device_ids {
            let result = if id == Self::DEVICE_ID {
                self.write(&message)
            } else {
                Err(NotifyError::UnknownDevice(id.clone()))
            };
            report.record(id, result);
        }

        report
    }
}
