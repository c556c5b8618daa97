//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::alerts::{Device, PeakEvent};
use crate::cli::args::OutputFormat;
use crate::config::AlertDefinitionConfig;
use crate::domain::Sample;
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Alert definition entry for display
#[derive(Debug, Clone, Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub channel: String,
    pub devices: Vec<String>,
    pub measurement_window: i64,
    pub cpu_threshold: u32,
    pub memory_threshold: u32,
    pub include_top_process: bool,
    pub enabled: bool,
}

impl From<&AlertDefinitionConfig> for RuleEntry {
    fn from(alert: &AlertDefinitionConfig) -> Self {
        Self {
            id: alert.id.clone(),
            channel: alert.channel.clone(),
            devices: alert.devices.iter().cloned().collect(),
            measurement_window: alert.measurement_window,
            cpu_threshold: alert.cpu_threshold,
            memory_threshold: alert.memory_threshold,
            include_top_process: alert.include_top_process,
            enabled: alert.enabled,
        }
    }
}

impl TableDisplay for RuleEntry {
    fn to_table(&self) -> String {
        let state = if self.enabled { "" } else { " (disabled)" };
        format!(
            "{}{}\n  Window: {} samples\n  Thresholds: CPU > {}%, RAM > {}%\n  Channel: {} -> {}\n  Top process: {}",
            self.id,
            state,
            self.measurement_window,
            self.cpu_threshold,
            self.memory_threshold,
            self.channel,
            self.devices.join(", "),
            if self.include_top_process { "yes" } else { "no" }
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "{}:{}x cpu>{} ram>{}",
            self.id, self.measurement_window, self.cpu_threshold, self.memory_threshold
        )
    }
}

/// Alert definition list for display
#[derive(Debug, Clone, Serialize)]
pub struct RuleList {
    pub rules: Vec<RuleEntry>,
}

impl TableDisplay for RuleList {
    fn to_table(&self) -> String {
        if self.rules.is_empty() {
            return "No alerts configured".to_string();
        }

        self.rules
            .iter()
            .map(|r| r.to_table())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn to_compact(&self) -> String {
        self.rules
            .iter()
            .map(|r| r.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of checking one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCheck {
    pub name: String,
    pub kind: String,
    pub key_accepted: Option<bool>,
    pub devices: Option<usize>,
}

/// Configuration check report
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: Option<String>,
    pub problems: Vec<String>,
    pub channels: Vec<ChannelCheck>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty() && self.channels.iter().all(|c| c.key_accepted != Some(false))
    }
}

impl TableDisplay for CheckReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "Config: {}\n",
            self.source.as_deref().unwrap_or("built-in defaults")
        );

        if self.problems.is_empty() {
            output.push_str("✓ All settings valid\n");
        } else {
            for problem in &self.problems {
                output.push_str(&format!("✗ {}\n", problem));
            }
        }

        for channel in &self.channels {
            let key = match channel.key_accepted {
                Some(true) => "key accepted",
                Some(false) => "key rejected",
                None => "no key",
            };
            let devices = channel
                .devices
                .map(|n| format!("{} devices", n))
                .unwrap_or_else(|| "devices unavailable".to_string());
            output.push_str(&format!(
                "  {} ({}): {}, {}\n",
                channel.name, channel.kind, key, devices
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        if self.is_ok() {
            "ok".to_string()
        } else {
            format!("{} problems", self.problems.len())
        }
    }
}

/// Channel device entry for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceEntry {
    pub id: String,
    pub name: String,
}

impl From<&Device> for DeviceEntry {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.display_name.clone(),
        }
    }
}

/// Channel device list for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceList {
    pub channel: String,
    pub devices: Vec<DeviceEntry>,
}

impl TableDisplay for DeviceList {
    fn to_table(&self) -> String {
        let mut output = format!("Channel: {}\n", self.channel);
        if self.devices.is_empty() {
            output.push_str("  No devices\n");
            return output;
        }

        output.push_str("  ID                        Name\n");
        output.push_str("  ────────────────────────────────────────────────\n");
        for device in &self.devices {
            output.push_str(&format!("  {:<25} {}\n", device.id, device.name));
        }

        output
    }

    fn to_compact(&self) -> String {
        self.devices
            .iter()
            .map(|d| d.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Sample history for display
#[derive(Debug, Clone, Serialize)]
pub struct HistoryList {
    pub path: String,
    pub samples: Vec<Sample>,
}

impl TableDisplay for HistoryList {
    fn to_table(&self) -> String {
        let mut output = format!("History: {} ({} samples)\n", self.path, self.samples.len());
        if self.samples.is_empty() {
            output.push_str("  No samples recorded\n");
            return output;
        }

        output.push_str("  Time                  CPU    RAM    Window\n");
        output.push_str("  ──────────────────────────────────────────\n");
        for sample in &self.samples {
            output.push_str(&format!(
                "  {:<21} {:<6} {:<6} {}s\n",
                sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
                format!("{}%", sample.average_cpu),
                format!("{}%", sample.average_memory),
                sample.window_duration.as_secs()
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        match self.samples.last() {
            Some(last) => format!("{} samples, last: {}", self.samples.len(), last),
            None => "0 samples".to_string(),
        }
    }
}

/// Peak event line for display while running
#[derive(Debug, Clone, Serialize)]
pub struct EventOutput {
    pub definition: String,
    pub kind: String,
    pub at: String,
    pub title: String,
    pub body: String,
}

impl From<&PeakEvent> for EventOutput {
    fn from(event: &PeakEvent) -> Self {
        Self {
            definition: event.definition_id.clone(),
            kind: event.kind.to_string(),
            at: event.at.to_rfc3339(),
            title: event.notification.title.clone(),
            body: event.notification.body.clone(),
        }
    }
}

impl TableDisplay for EventOutput {
    fn to_table(&self) -> String {
        format!("[{}] {}\n{}", self.kind, self.definition, self.body)
    }

    fn to_compact(&self) -> String {
        format!("{} {} {}", self.at, self.kind, self.definition)
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
