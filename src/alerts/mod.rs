//! Alert engine and notification system
//!
//! Windowed threshold alerting with hysteresis: one open peak report per
//! definition, start and end notifications dispatched to shared channels.

pub mod channels;
mod engine;
mod notifier;
mod reading_log;
mod types;

pub use engine::{AlertEngine, EngineConfig, END_SUMMARY_WINDOW, TOP_PROCESS_WINDOW};
pub use notifier::{DeliveryReport, Device, NotificationProvider, TerminalNotifier};
pub use reading_log::ReadingLog;
pub use types::{
    AlertDefinition, DefinitionUpdate, Notification, PeakEvent, PeakEventKind, PeakReport,
    ReportState, Stamped,
};
