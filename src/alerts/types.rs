//! Alert system domain types
//!
//! Defines alert definitions, notifications and the per-episode peak report
//! state machine.

use super::notifier::NotificationProvider;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A titled message handed to a notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.title, self.body)
    }
}

/// Threshold alert definition
///
/// The channel is shared: one provider may back several definitions.
#[derive(Clone)]
pub struct AlertDefinition {
    /// Unique definition identifier
    pub id: String,
    /// Channel that delivers this definition's notifications
    pub channel: Arc<dyn NotificationProvider>,
    /// Devices the channel should deliver to
    pub device_ids: BTreeSet<String>,
    /// Number of trailing samples averaged for the threshold check (0 = inert)
    pub measurement_window: usize,
    /// Average CPU percent that must be exceeded
    pub cpu_threshold: u32,
    /// Average memory usage that must be exceeded
    pub memory_threshold: u32,
    /// Name the top consuming process in start notifications
    pub include_top_process: bool,
}

impl AlertDefinition {
    /// Create a new definition
    pub fn new(
        id: impl Into<String>,
        channel: Arc<dyn NotificationProvider>,
        measurement_window: usize,
        cpu_threshold: u32,
        memory_threshold: u32,
    ) -> Self {
        Self {
            id: id.into(),
            channel,
            device_ids: BTreeSet::new(),
            measurement_window,
            cpu_threshold,
            memory_threshold,
            include_top_process: false,
        }
    }

    /// Set target devices
    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_ids = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Include the top consuming process in start notifications
    pub fn with_top_process(mut self) -> Self {
        self.include_top_process = true;
        self
    }

    /// Whether the definition can ever trigger
    ///
    /// A non-positive window or an empty device set leaves it inert.
    pub fn is_active(&self) -> bool {
        self.measurement_window > 0 && !self.device_ids.is_empty()
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: DefinitionUpdate) {
        if let Some(channel) = update.channel {
            self.channel = channel;
        }
        if let Some(devices) = update.device_ids {
            self.device_ids = devices;
        }
        if let Some(window) = update.measurement_window {
            self.measurement_window = window;
        }
        if let Some(cpu) = update.cpu_threshold {
            self.cpu_threshold = cpu;
        }
        if let Some(memory) = update.memory_threshold {
            self.memory_threshold = memory;
        }
        if let Some(top) = update.include_top_process {
            self.include_top_process = top;
        }
    }
}

impl fmt::Debug for AlertDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDefinition")
            .field("id", &self.id)
            .field("channel", &self.channel.name())
            .field("device_ids", &self.device_ids)
            .field("measurement_window", &self.measurement_window)
            .field("cpu_threshold", &self.cpu_threshold)
            .field("memory_threshold", &self.memory_threshold)
            .field("include_top_process", &self.include_top_process)
            .finish()
    }
}

/// Partial change to an [`AlertDefinition`], applied between updates
#[derive(Clone, Default)]
pub struct DefinitionUpdate {
    pub channel: Option<Arc<dyn NotificationProvider>>,
    pub device_ids: Option<BTreeSet<String>>,
    pub measurement_window: Option<usize>,
    pub cpu_threshold: Option<u32>,
    pub memory_threshold: Option<u32>,
    pub include_top_process: Option<bool>,
}

impl DefinitionUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.channel.is_none()
            && self.device_ids.is_none()
            && self.measurement_window.is_none()
            && self.cpu_threshold.is_none()
            && self.memory_threshold.is_none()
            && self.include_top_process.is_none()
    }
}

/// A notification together with the moment it was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stamped {
    pub notification: Notification,
    pub at: DateTime<Local>,
}

/// Lifecycle of one peak episode
///
/// `Closed` keeps the opening notification, so a closed-before-open report
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportState {
    /// Created, nothing sent yet
    Pending,
    /// Start notification recorded
    Open { opened: Stamped },
    /// Start and end notifications recorded
    Closed { opened: Stamped, closed: Stamped },
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open { .. } => write!(f, "OPEN"),
            Self::Closed { .. } => write!(f, "CLOSED"),
        }
    }
}

/// One excursion above threshold for one definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakReport {
    pub definition_id: String,
    pub state: ReportState,
}

impl PeakReport {
    /// Create a pending report for a definition
    pub fn new(definition_id: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            state: ReportState::Pending,
        }
    }

    /// Record the start notification
    ///
    /// Set-once: returns `false` and changes nothing unless the report is
    /// still pending.
    pub fn open(&mut self, notification: Notification, at: DateTime<Local>) -> bool {
        match self.state {
            ReportState::Pending => {
                self.state = ReportState::Open {
                    opened: Stamped { notification, at },
                };
                true
            }
            _ => false,
        }
    }

    /// Record the end notification
    ///
    /// Set-once: returns `false` and changes nothing unless the report is open.
    pub fn close(&mut self, notification: Notification, at: DateTime<Local>) -> bool {
        let opened = match &self.state {
            ReportState::Open { opened } => opened.clone(),
            _ => return false,
        };
        self.state = ReportState::Closed {
            opened,
            closed: Stamped { notification, at },
        };
        true
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ReportState::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReportState::Closed { .. })
    }

    pub fn opened(&self) -> Option<&Stamped> {
        match &self.state {
            ReportState::Pending => None,
            ReportState::Open { opened } | ReportState::Closed { opened, .. } => Some(opened),
        }
    }

    pub fn closed(&self) -> Option<&Stamped> {
        match &self.state {
            ReportState::Closed { closed, .. } => Some(closed),
            _ => None,
        }
    }

    pub fn opened_at(&self) -> Option<DateTime<Local>> {
        self.opened().map(|s| s.at)
    }

    pub fn closed_at(&self) -> Option<DateTime<Local>> {
        self.closed().map(|s| s.at)
    }
}

/// Kind of transition emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeakEventKind {
    Started,
    Ended,
}

impl fmt::Display for PeakEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "PEAK START"),
            Self::Ended => write!(f, "PEAK END"),
        }
    }
}

/// A report transition produced by one engine update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakEvent {
    pub definition_id: String,
    pub kind: PeakEventKind,
    pub notification: Notification,
    pub at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingNotifier;
    use chrono::Duration;

    fn note(body: &str) -> Notification {
        Notification::new("title", body)
    }

    #[test]
    fn test_report_lifecycle() {
        let now = Local::now();
        let mut report = PeakReport::new("cpu-high");
        assert_eq!(report.state, ReportState::Pending);
        assert!(!report.is_open());

        assert!(report.open(note("start"), now));
        assert!(report.is_open());
        assert_eq!(report.opened_at(), Some(now));

        let later = now + Duration::minutes(5);
        assert!(report.close(note("end"), later));
        assert!(report.is_closed());
        assert_eq!(report.opened_at(), Some(now));
        assert_eq!(report.closed_at(), Some(later));
    }

    #[test]
    fn test_report_open_is_set_once() {
        let now = Local::now();
        let mut report = PeakReport::new("cpu-high");
        assert!(report.open(note("first"), now));
        assert!(!report.open(note("second"), now + Duration::minutes(1)));

        assert_eq!(report.opened().unwrap().notification.body, "first");
        assert_eq!(report.opened_at(), Some(now));
    }

    #[test]
    fn test_report_close_requires_open() {
        let mut report = PeakReport::new("cpu-high");
        assert!(!report.close(note("end"), Local::now()));
        assert_eq!(report.state, ReportState::Pending);
    }

    #[test]
    fn test_report_close_is_set_once() {
        let now = Local::now();
        let mut report = PeakReport::new("cpu-high");
        report.open(note("start"), now);
        assert!(report.close(note("end"), now));
        assert!(!report.close(note("again"), now + Duration::minutes(2)));
        assert_eq!(report.closed().unwrap().notification.body, "end");
    }

    #[test]
    fn test_definition_apply_update() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut def = AlertDefinition::new("cpu-high", channel, 3, 30, 90).with_devices(["a"]);

        def.apply(DefinitionUpdate {
            cpu_threshold: Some(50),
            measurement_window: Some(5),
            ..Default::default()
        });

        assert_eq!(def.cpu_threshold, 50);
        assert_eq!(def.measurement_window, 5);
        assert_eq!(def.memory_threshold, 90);
        assert!(def.device_ids.contains("a"));
    }

    #[test]
    fn test_inert_definition() {
        let channel = Arc::new(RecordingNotifier::new());
        let def = AlertDefinition::new("inert", channel.clone(), 0, 30, 30).with_devices(["a"]);
        assert!(!def.is_active());

        let def = AlertDefinition::new("no-devices", channel.clone(), 3, 30, 30);
        assert!(!def.is_active());

        let def = AlertDefinition::new("live", channel, 3, 30, 30).with_devices(["a"]);
        assert!(def.is_active());
    }

    #[test]
    fn test_empty_update() {
        assert!(DefinitionUpdate::default().is_empty());
        let update = DefinitionUpdate {
            include_top_process: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
